//! Interest Graph - the weighted, self-linking set of tracked topics.

use interest_model::{elapsed_hours, ConnectionOrigin, GraphConfig, MemoryType, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{jaccard, normalize_topic, Connection, InterestNode, NodeId, NodeView};

/// What an `add_or_reinforce` call changed.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestUpdate {
    /// The node after the update.
    pub node: NodeView,
    /// Whether the topic was new.
    pub created: bool,
    /// Topic evicted to make room, if any.
    pub evicted: Option<String>,
    /// Topics organically linked to the new node.
    pub linked: Vec<String>,
    /// Topics that crossed the core threshold during the update.
    pub became_core: Vec<String>,
}

/// What a decay tick changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    /// Nodes that lost weight.
    pub decayed: usize,
    /// Topics removed for falling below the minimum weight.
    pub evicted: Vec<String>,
    /// Topics whose weight is now at or above the core threshold.
    pub became_core: Vec<String>,
    /// Topics that fell from core back to long-term.
    pub left_core: Vec<String>,
}

/// Result of asking the graph to link two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkResult {
    Created,
    AlreadyLinked,
    /// Same node, or a handle that is no longer live.
    Invalid,
}

/// Aggregate snapshot of the graph for schedulers and dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total: usize,
    pub core: usize,
    pub long_term: usize,
    pub short_term: usize,
    /// Undirected links.
    pub connections: usize,
    /// Log entries created by dream replay.
    pub dream_connections: usize,
    pub average_weight: f64,
}

/// The interest graph.
///
/// Nodes live in an arena addressed by `NodeId`; the topic string is only a
/// lookup key into it. Links are symmetric and kept in both endpoints.
#[derive(Debug, Clone)]
pub struct InterestGraph {
    config: GraphConfig,

    slots: Vec<Option<InterestNode>>,

    /// Vacated slots, reused before the arena grows.
    free: Vec<u32>,

    /// Index: normalized topic -> arena handle.
    index: HashMap<String, NodeId>,

    connection_log: Vec<Connection>,
}

impl Default for InterestGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl InterestGraph {
    /// Create an empty graph.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            connection_log: Vec::new(),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Drop every node and log entry, keeping the configuration.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.connection_log.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if a topic (in any casing/spacing) is tracked.
    pub fn contains(&self, topic: &str) -> bool {
        self.id_of(topic).is_some()
    }

    /// Get a view of a topic's node.
    pub fn get(&self, topic: &str) -> Option<NodeView> {
        self.id_of(topic).and_then(|id| self.view(id))
    }

    /// Add a new interest or reinforce an existing one.
    ///
    /// New topics start at `initial_weight` and are linked to every existing
    /// node whose keyword overlap reaches `connection_threshold`. Known topics
    /// gain `strength` and spread a fraction of the gain to their neighbors.
    /// Returns `None` for a topic that normalizes to nothing.
    pub fn add_or_reinforce(
        &mut self,
        topic: &str,
        strength: f64,
        now: Timestamp,
    ) -> Option<InterestUpdate> {
        let key = normalize_topic(topic);
        if key.is_empty() {
            return None;
        }

        match self.index.get(&key).copied() {
            Some(id) => self.reinforce(id, strength, now),
            None => self.insert_new(key, now),
        }
    }

    /// Add or reinforce every topic found in one piece of content and stamp
    /// each with the content's source label.
    pub fn record_discovery<I, S>(
        &mut self,
        topics: I,
        source: &str,
        strength: f64,
        now: Timestamp,
    ) -> Vec<InterestUpdate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut updates = Vec::new();
        for topic in topics {
            let Some(mut update) = self.add_or_reinforce(topic.as_ref(), strength, now) else {
                continue;
            };
            if let Some(id) = self.index.get(&update.node.topic).copied() {
                if let Some(node) = self.node_mut(id) {
                    node.discovered_in.insert(source.to_string());
                }
                update.node.discovered_in.insert(source.to_string());
            }
            updates.push(update);
        }
        updates
    }

    /// Keyword similarity of two tracked topics; 0 if either is unknown.
    pub fn similarity(&self, topic_a: &str, topic_b: &str) -> f64 {
        match (self.id_of(topic_a), self.id_of(topic_b)) {
            (Some(a), Some(b)) => self.similarity_of(a, b),
            _ => 0.0,
        }
    }

    /// Apply time decay, evict what fell below `min_weight`, then re-evaluate tiers.
    pub fn decay_tick(&mut self, now: Timestamp) -> DecayReport {
        let mut report = DecayReport::default();
        let config = self.config.clone();

        for node in self.slots.iter_mut().flatten() {
            let multiplier = node.memory_type.decay_multiplier(
                config.core_decay_multiplier,
                config.long_term_decay_multiplier,
            );
            let amount =
                config.decay_rate_per_hour * elapsed_hours(node.last_active, now) * multiplier;
            if amount > 0.0 {
                node.weight = (node.weight - amount).max(0.0);
                report.decayed += 1;
            }
        }

        let faded: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| node.weight < config.min_weight)
            .map(|(id, _)| id)
            .collect();
        for id in faded {
            if let Some(node) = self.evict(id) {
                report.evicted.push(node.topic);
            }
        }

        for node in self.slots.iter_mut().flatten() {
            match node.refresh_tier(config.core_threshold) {
                Some(MemoryType::Core) => report.left_core.push(node.topic.clone()),
                Some(_) => report.became_core.push(node.topic.clone()),
                None => {}
            }
        }

        debug!(
            decayed = report.decayed,
            evicted = report.evicted.len(),
            became_core = report.became_core.len(),
            left_core = report.left_core.len(),
            "decay tick applied"
        );
        report
    }

    /// Remove the lowest-weight non-core node.
    ///
    /// Returns the evicted topic, or `None` if the graph is empty or all core.
    pub fn evict_weakest(&mut self) -> Option<String> {
        let weakest = self
            .iter()
            .filter(|(_, node)| !node.is_core())
            .min_by(|a, b| {
                a.1.weight
                    .partial_cmp(&b.1.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| id)?;
        self.evict(weakest).map(|node| node.topic)
    }

    /// Remove a topic and every link to it.
    pub fn remove(&mut self, topic: &str) -> Option<NodeView> {
        let id = self.id_of(topic)?;
        let view = self.view(id);
        self.evict(id);
        view
    }

    /// Add weight to a topic (capped). Returns the gain, or `None` if unknown.
    pub fn boost(&mut self, topic: &str, amount: f64) -> Option<f64> {
        let id = self.id_of(topic)?;
        Some(self.boost_node(id, amount))
    }

    /// Move a short-term topic to long-term memory.
    ///
    /// Returns `false` if the topic is unknown or not short-term.
    pub fn mark_long_term(&mut self, topic: &str) -> bool {
        let Some(id) = self.id_of(topic) else {
            return false;
        };
        match self.node_mut(id) {
            Some(node) if node.memory_type == MemoryType::ShortTerm => {
                node.memory_type = MemoryType::LongTerm;
                true
            }
            _ => false,
        }
    }

    /// Check whether two topics are directly linked.
    pub fn are_linked(&self, topic_a: &str, topic_b: &str) -> bool {
        match (self.id_of(topic_a), self.id_of(topic_b)) {
            (Some(a), Some(b)) => self.node(a).is_some_and(|node| node.is_linked_to(b)),
            _ => false,
        }
    }

    /// Topics directly linked to `topic`.
    pub fn neighbors(&self, topic: &str) -> Vec<String> {
        self.id_of(topic)
            .and_then(|id| self.node(id))
            .map(|node| self.topics_of(node.connections.iter().copied()))
            .unwrap_or_default()
    }

    /// Link two topics; both must be tracked.
    pub fn connect(
        &mut self,
        topic_a: &str,
        topic_b: &str,
        strength: f64,
        origin: ConnectionOrigin,
        now: Timestamp,
    ) -> LinkResult {
        match (self.id_of(topic_a), self.id_of(topic_b)) {
            (Some(a), Some(b)) => self.link(a, b, strength, origin, now),
            _ => LinkResult::Invalid,
        }
    }

    pub fn connection_log(&self) -> &[Connection] {
        &self.connection_log
    }

    /// The `n` heaviest interests, heaviest first.
    pub fn get_top_interests(&self, n: usize) -> Vec<NodeView> {
        let mut views = self.get_interests_sorted();
        views.truncate(n);
        views
    }

    /// All interests, heaviest first; ties by topic.
    pub fn get_interests_sorted(&self) -> Vec<NodeView> {
        let mut views: Vec<NodeView> = self.iter().map(|(_, node)| self.view_of(node)).collect();
        views.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        views
    }

    pub fn get_stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        let mut degree_sum = 0;
        let mut weight_sum = 0.0;

        for (_, node) in self.iter() {
            stats.total += 1;
            match node.memory_type {
                MemoryType::Core => stats.core += 1,
                MemoryType::LongTerm => stats.long_term += 1,
                MemoryType::ShortTerm => stats.short_term += 1,
            }
            degree_sum += node.connection_count();
            weight_sum += node.weight;
        }

        stats.connections = degree_sum / 2;
        stats.dream_connections = self
            .connection_log
            .iter()
            .filter(|c| c.origin == ConnectionOrigin::Dream)
            .count();
        if stats.total > 0 {
            stats.average_weight = weight_sum / stats.total as f64;
        }
        stats
    }

    // ---- crate-internal arena access ------------------------------------

    pub(crate) fn id_of(&self, topic: &str) -> Option<NodeId> {
        self.index
            .get(topic)
            .or_else(|| self.index.get(&normalize_topic(topic)))
            .copied()
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&InterestNode> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut InterestNode> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live nodes in arena order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeId, &InterestNode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId(i as u32), node)))
    }

    pub(crate) fn node_ids(&self) -> Vec<NodeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub(crate) fn view(&self, id: NodeId) -> Option<NodeView> {
        self.node(id).map(|node| self.view_of(node))
    }

    fn view_of(&self, node: &InterestNode) -> NodeView {
        NodeView {
            topic: node.topic.clone(),
            weight: node.weight,
            connections: self.topics_of(node.connections.iter().copied()).into_iter().collect(),
            keywords: node.keywords.clone(),
            discovered_in: node.discovered_in.clone(),
            created_at: node.created_at,
            last_active: node.last_active,
            access_count: node.access_count,
            is_core: node.is_core(),
            memory_type: node.memory_type,
        }
    }

    pub(crate) fn similarity_of(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.node(a), self.node(b)) {
            (Some(a), Some(b)) => jaccard(&a.keywords, &b.keywords),
            _ => 0.0,
        }
    }

    /// Create a symmetric link and log it.
    pub(crate) fn link(
        &mut self,
        a: NodeId,
        b: NodeId,
        strength: f64,
        origin: ConnectionOrigin,
        now: Timestamp,
    ) -> LinkResult {
        if a == b || self.node(a).is_none() || self.node(b).is_none() {
            return LinkResult::Invalid;
        }
        if self.node(a).is_some_and(|node| node.is_linked_to(b)) {
            return LinkResult::AlreadyLinked;
        }

        self.attach(a, b);
        let topic = |id: NodeId| self.node(id).map(|n| n.topic.clone()).unwrap_or_default();
        let connection = Connection {
            from: topic(a),
            to: topic(b),
            strength,
            created_at: now,
            origin,
        };
        self.connection_log.push(connection);
        LinkResult::Created
    }

    /// Add capped weight and refresh the tier. Returns the gain.
    pub(crate) fn boost_node(&mut self, id: NodeId, amount: f64) -> f64 {
        let max_weight = self.config.max_weight;
        let core_threshold = self.config.core_threshold;
        match self.node_mut(id) {
            Some(node) => {
                let gain = node.add_weight(amount, max_weight);
                node.refresh_tier(core_threshold);
                gain
            }
            None => 0.0,
        }
    }

    /// Place a node into the arena without link discovery.
    pub(crate) fn insert_node(&mut self, node: InterestNode) -> NodeId {
        let key = node.topic.clone();
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        };
        self.index.insert(key, id);
        id
    }

    /// Link two nodes without logging. Used when restoring snapshots.
    pub(crate) fn attach(&mut self, a: NodeId, b: NodeId) {
        if a == b || self.node(a).is_none() || self.node(b).is_none() {
            return;
        }
        if let Some(node) = self.node_mut(a) {
            node.connections.insert(b);
        }
        if let Some(node) = self.node_mut(b) {
            node.connections.insert(a);
        }
    }

    pub(crate) fn push_log(&mut self, connection: Connection) {
        self.connection_log.push(connection);
    }

    // ---- private ---------------------------------------------------------

    fn topics_of(&self, ids: impl Iterator<Item = NodeId>) -> Vec<String> {
        ids.filter_map(|id| self.node(id).map(|node| node.topic.clone()))
            .collect()
    }

    fn reinforce(&mut self, id: NodeId, strength: f64, now: Timestamp) -> Option<InterestUpdate> {
        let max_weight = self.config.max_weight;
        let core_threshold = self.config.core_threshold;
        let mut became_core = Vec::new();

        let (gain, neighbors) = match self.node_mut(id) {
            Some(node) => {
                let gain = node.add_weight(strength, max_weight);
                node.last_active = now;
                node.access_count = node.access_count.saturating_add(1);
                if node.refresh_tier(core_threshold).is_some() && node.is_core() {
                    became_core.push(node.topic.clone());
                }
                (gain, node.connections.iter().copied().collect::<Vec<_>>())
            }
            None => (0.0, Vec::new()),
        };

        let spread = gain * self.config.reinforcement_factor;
        if spread > 0.0 {
            for neighbor in neighbors {
                if let Some(node) = self.node_mut(neighbor) {
                    node.add_weight(spread, max_weight);
                    if node.refresh_tier(core_threshold).is_some() && node.is_core() {
                        became_core.push(node.topic.clone());
                    }
                }
            }
        }

        Some(InterestUpdate {
            node: self.view(id)?,
            created: false,
            evicted: None,
            linked: Vec::new(),
            became_core,
        })
    }

    fn insert_new(&mut self, key: String, now: Timestamp) -> Option<InterestUpdate> {
        let evicted = if self.len() >= self.config.max_short_term_interests {
            self.evict_weakest()
        } else {
            None
        };

        let mut node = InterestNode::new(key, self.config.initial_weight, now);
        node.refresh_tier(self.config.core_threshold);
        let id = self.insert_node(node);

        let threshold = self.config.connection_threshold;
        let related: Vec<(NodeId, f64)> = self
            .iter()
            .filter(|(other, _)| *other != id)
            .map(|(other, _)| (other, self.similarity_of(id, other)))
            .filter(|(_, similarity)| *similarity >= threshold)
            .collect();

        let mut linked = Vec::new();
        let mut became_core = Vec::new();
        let boost = self.config.association_boost;
        for (other, similarity) in related {
            if self.link(id, other, similarity, ConnectionOrigin::Organic, now) == LinkResult::Created
            {
                let was_core = self.node(other).is_some_and(InterestNode::is_core);
                self.boost_node(other, boost);
                if let Some(node) = self.node(other) {
                    if !was_core && node.is_core() {
                        became_core.push(node.topic.clone());
                    }
                    linked.push(node.topic.clone());
                }
            }
        }

        let view = self.view(id)?;
        debug!(topic = %view.topic, links = linked.len(), evicted = ?evicted, "interest added");
        Some(InterestUpdate {
            node: view,
            created: true,
            evicted,
            linked,
            became_core,
        })
    }

    fn evict(&mut self, id: NodeId) -> Option<InterestNode> {
        let node = self.slots.get_mut(id.index())?.take()?;
        for neighbor in &node.connections {
            if let Some(other) = self.node_mut(*neighbor) {
                other.connections.remove(&id);
            }
        }
        self.index.remove(&node.topic);
        self.connection_log.retain(|c| !c.involves(&node.topic));
        self.free.push(id.0);
        debug!(topic = %node.topic, weight = node.weight, "interest evicted");
        Some(node)
    }
}
