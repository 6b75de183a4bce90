//! Long-term store entries and semantic clusters.

use interest_model::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::interest_graph::NodeView;

/// A promoted interest, kept after the graph may have forgotten it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermEntry {
    pub topic: String,
    pub weight: f64,
    pub connections: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
    pub access_count: u32,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
    /// Most recent promotion of this topic.
    pub promoted_at: Timestamp,
}

impl LongTermEntry {
    /// Copy a node into a fresh entry.
    pub fn from_node(node: &NodeView, now: Timestamp) -> Self {
        Self {
            topic: node.topic.clone(),
            weight: node.weight,
            connections: node.connections.clone(),
            keywords: node.keywords.clone(),
            access_count: node.access_count,
            created_at: node.created_at,
            last_active: node.last_active,
            promoted_at: now,
        }
    }

    /// Fold a re-promoted node into this entry: keep the higher weight,
    /// union the links, add up the accesses.
    pub fn merge(&mut self, node: &NodeView, now: Timestamp) {
        self.weight = self.weight.max(node.weight);
        self.connections.extend(node.connections.iter().cloned());
        self.keywords.extend(node.keywords.iter().cloned());
        self.access_count = self.access_count.saturating_add(node.access_count);
        self.created_at = self.created_at.min(node.created_at);
        self.last_active = self.last_active.max(node.last_active);
        self.promoted_at = now;
    }
}

/// A group of related long-term topics, named after its first member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    /// Members in the order they joined.
    pub members: Vec<String>,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            members: vec![name.clone()],
            name,
        }
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.members.iter().any(|m| m == topic)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
