//! Interest nodes - the tracked topics of the graph.

use interest_model::{ConnectionOrigin, MemoryType, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::extract_keywords;

/// Arena handle of a node. Only valid for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tracked topic with a decaying weight.
#[derive(Debug, Clone)]
pub struct InterestNode {
    /// Normalized topic key.
    pub topic: String,

    pub weight: f64,

    /// Adjacent nodes. Always mirrored on the other side.
    pub(crate) connections: BTreeSet<NodeId>,

    pub keywords: BTreeSet<String>,

    /// Labels of the content sources that surfaced this topic.
    pub discovered_in: BTreeSet<String>,

    pub created_at: Timestamp,
    pub last_active: Timestamp,

    /// Number of times the topic was added or reinforced, at least 1.
    pub access_count: u32,

    pub memory_type: MemoryType,
}

impl InterestNode {
    /// Create a short-term node for an already-normalized topic.
    pub fn new(topic: impl Into<String>, weight: f64, now: Timestamp) -> Self {
        let topic = topic.into();
        Self {
            keywords: extract_keywords(&topic),
            topic,
            weight,
            connections: BTreeSet::new(),
            discovered_in: BTreeSet::new(),
            created_at: now,
            last_active: now,
            access_count: 1,
            memory_type: MemoryType::ShortTerm,
        }
    }

    pub fn is_core(&self) -> bool {
        self.memory_type == MemoryType::Core
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn is_linked_to(&self, other: NodeId) -> bool {
        self.connections.contains(&other)
    }

    /// Add to the weight, capped at `max_weight`. Returns the gain actually applied.
    pub(crate) fn add_weight(&mut self, amount: f64, max_weight: f64) -> f64 {
        let before = self.weight;
        self.weight = (self.weight + amount).min(max_weight);
        self.weight - before
    }

    /// Re-evaluate the memory tier after a weight change.
    ///
    /// Returns the previous tier when it changed.
    pub(crate) fn refresh_tier(&mut self, core_threshold: f64) -> Option<MemoryType> {
        let next = self.memory_type.after_weight_change(self.weight, core_threshold);
        if next != self.memory_type {
            let previous = self.memory_type;
            self.memory_type = next;
            Some(previous)
        } else {
            None
        }
    }
}

/// Read-only copy of a node with its neighbors resolved to topic keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub topic: String,
    pub weight: f64,
    pub connections: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub discovered_in: BTreeSet<String>,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
    pub access_count: u32,
    pub is_core: bool,
    pub memory_type: MemoryType,
}

impl NodeView {
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Log entry recording that a link was formed. Adjacency is authoritative;
/// the log may hold several entries for the same pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub strength: f64,
    pub created_at: Timestamp,
    pub origin: ConnectionOrigin,
}

impl Connection {
    pub fn involves(&self, topic: &str) -> bool {
        self.from == topic || self.to == topic
    }
}
