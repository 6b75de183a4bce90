//! Memory Consolidator - promotes lasting interests and groups them by theme.
//!
//! A consolidation pass works in two stages:
//! 1. **Promotion**: every short-term interest is scored; those reaching the
//!    promotion threshold are merged into the long-term store and flagged
//!    long-term in the graph. Faint interests are only reported.
//! 2. **Clustering**: clusters are rebuilt from scratch, first-fit in store
//!    order, pulling each topic's linked long-term topics along with it.

use interest_model::{elapsed_days, MemoryConfig, MemoryType, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::{Cluster, LongTermEntry};
use crate::interest_graph::{jaccard, InterestGraph, NodeView};

/// Links at which the connectivity sub-score saturates.
const CONNECTIVITY_SATURATION: f64 = 10.0;

/// Accesses at which the rehearsal sub-score saturates (log scale).
const ACCESS_SATURATION: f64 = 50.0;

/// Age at which the recency sub-score reaches zero.
const RECENCY_WINDOW_DAYS: f64 = 7.0;

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    /// Topics merged into the long-term store.
    pub promoted: Vec<String>,
    /// Short-term topics faint enough to be forgotten. Not removed here.
    pub forgotten: Vec<String>,
    /// Number of clusters after the rebuild.
    pub clusters: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub long_term: usize,
    pub clusters: usize,
    pub largest_cluster: usize,
}

/// Owner of the long-term store and its clusters.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsolidator {
    config: MemoryConfig,

    /// Entries in promotion order.
    entries: Vec<LongTermEntry>,

    /// Index: topic -> position in `entries`.
    positions: HashMap<String, usize>,

    clusters: Vec<Cluster>,
}

impl MemoryConsolidator {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.positions.clear();
        self.clusters.clear();
    }

    /// Promotion score in `[0, 1]`.
    ///
    /// Weighted sum: weight 30%, connectivity 30%, rehearsal 20%, recency 20%.
    pub fn score_for_promotion(node: &NodeView, max_weight: f64, now: Timestamp) -> f64 {
        let weight_score = if max_weight > 0.0 {
            (node.weight / max_weight).min(1.0)
        } else {
            0.0
        };
        let connection_score =
            (node.connection_count() as f64 / CONNECTIVITY_SATURATION).min(1.0);
        let access_score =
            ((node.access_count as f64 + 1.0).ln() / (ACCESS_SATURATION + 1.0).ln()).min(1.0);
        let age_days = elapsed_days(node.created_at, now);
        let recency_score = (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0);

        0.3 * weight_score + 0.3 * connection_score + 0.2 * access_score + 0.2 * recency_score
    }

    /// Run one consolidation pass over the graph.
    pub fn consolidate(&mut self, graph: &mut InterestGraph, now: Timestamp) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        let max_weight = graph.config().max_weight;

        let short_term: Vec<NodeView> = graph
            .get_interests_sorted()
            .into_iter()
            .filter(|node| node.memory_type == MemoryType::ShortTerm)
            .collect();

        for node in short_term {
            let score = Self::score_for_promotion(&node, max_weight, now);
            if score >= self.config.promotion_threshold {
                self.store(&node, now);
                graph.mark_long_term(&node.topic);
                report.promoted.push(node.topic);
            } else if node.weight < self.config.forget_threshold {
                report.forgotten.push(node.topic);
            }
        }

        self.cluster_memories();
        report.clusters = self.clusters.len();

        info!(
            promoted = report.promoted.len(),
            forgotten = report.forgotten.len(),
            clusters = report.clusters,
            long_term = self.entries.len(),
            "memory consolidation complete"
        );
        report
    }

    /// Rebuild every cluster from the long-term store.
    pub fn cluster_memories(&mut self) {
        let threshold = self.config.cluster_similarity_threshold;
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut assigned: HashSet<&str> = HashSet::new();

        for entry in &self.entries {
            if assigned.contains(entry.topic.as_str()) {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (i, cluster) in clusters.iter().enumerate() {
                let average = self.average_similarity(entry, cluster);
                if average > threshold && best.map_or(true, |(_, b)| average > b) {
                    best = Some((i, average));
                }
            }

            let target = match best {
                Some((i, _)) => {
                    clusters[i].members.push(entry.topic.clone());
                    i
                }
                None => {
                    clusters.push(Cluster::new(entry.topic.clone()));
                    clusters.len() - 1
                }
            };
            assigned.insert(entry.topic.as_str());

            for linked in &entry.connections {
                if let Some(&pos) = self.positions.get(linked) {
                    let topic = self.entries[pos].topic.as_str();
                    if assigned.insert(topic) {
                        clusters[target].members.push(topic.to_string());
                    }
                }
            }
        }

        self.clusters = clusters;
    }

    pub fn long_term_entries(&self) -> &[LongTermEntry] {
        &self.entries
    }

    pub fn long_term(&self, topic: &str) -> Option<&LongTermEntry> {
        self.positions.get(topic).map(|&pos| &self.entries[pos])
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// The cluster holding a topic.
    pub fn cluster_of(&self, topic: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.contains(topic))
    }

    pub fn get_stats(&self) -> MemoryStats {
        MemoryStats {
            long_term: self.entries.len(),
            clusters: self.clusters.len(),
            largest_cluster: self.clusters.iter().map(Cluster::len).max().unwrap_or(0),
        }
    }

    pub(crate) fn from_parts(
        config: MemoryConfig,
        entries: Vec<LongTermEntry>,
        clusters: Vec<Cluster>,
    ) -> Self {
        let mut consolidator = Self::new(config);
        for entry in entries {
            match consolidator.positions.get(&entry.topic) {
                Some(&pos) => consolidator.entries[pos] = entry,
                None => {
                    consolidator
                        .positions
                        .insert(entry.topic.clone(), consolidator.entries.len());
                    consolidator.entries.push(entry);
                }
            }
        }
        consolidator.clusters = clusters
            .into_iter()
            .filter_map(|mut cluster| {
                cluster
                    .members
                    .retain(|topic| consolidator.positions.contains_key(topic));
                (!cluster.is_empty()).then_some(cluster)
            })
            .collect();
        consolidator
    }

    fn store(&mut self, node: &NodeView, now: Timestamp) {
        match self.positions.get(&node.topic) {
            Some(&pos) => self.entries[pos].merge(node, now),
            None => {
                self.positions.insert(node.topic.clone(), self.entries.len());
                self.entries.push(LongTermEntry::from_node(node, now));
            }
        }
    }

    fn average_similarity(&self, entry: &LongTermEntry, cluster: &Cluster) -> f64 {
        let scores: Vec<f64> = cluster
            .members
            .iter()
            .filter_map(|member| self.long_term(member))
            .map(|member| jaccard(&entry.keywords, &member.keywords))
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use interest_model::GraphConfig;

    fn consolidator() -> MemoryConsolidator {
        MemoryConsolidator::new(MemoryConfig::default())
    }

    /// A short-term topic rehearsed 50 times, weight 0.741: scores about 0.62.
    fn strong_topic(graph: &mut InterestGraph, topic: &str, now: Timestamp) {
        graph.add_or_reinforce(topic, 0.0, now);
        for _ in 0..49 {
            graph.add_or_reinforce(topic, 0.009, now);
        }
    }

    #[test]
    fn test_score_components() {
        let mut graph = InterestGraph::default();
        let now = Utc::now();
        let node = graph.add_or_reinforce("astronomy", 0.0, now).unwrap().node;

        // weight 0.3, no links, one access, brand new.
        let expected = 0.3 * 0.3 + 0.0 + 0.2 * (2.0f64.ln() / 51.0f64.ln()) + 0.2;
        let score = MemoryConsolidator::score_for_promotion(&node, 1.0, now);
        assert!((score - expected).abs() < 1e-9);

        // After a week the recency term is gone.
        let old = MemoryConsolidator::score_for_promotion(&node, 1.0, now + Duration::days(8));
        assert!((score - old - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_score_saturates() {
        let mut graph = InterestGraph::default();
        let now = Utc::now();
        let mut node = graph.add_or_reinforce("astronomy", 0.0, now).unwrap().node;
        node.weight = 1.0;
        node.access_count = 500;
        node.connections = (0..20).map(|i| format!("topic {}", i)).collect();

        let score = MemoryConsolidator::score_for_promotion(&node, 1.0, now);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_consolidate_promotes_and_marks_long_term() {
        let mut graph = InterestGraph::default();
        let mut memory = consolidator();
        let now = Utc::now();
        strong_topic(&mut graph, "astronomy", now);
        graph.add_or_reinforce("botany", 0.0, now);

        let report = memory.consolidate(&mut graph, now);

        assert_eq!(report.promoted, vec!["astronomy".to_string()]);
        assert!(report.forgotten.is_empty());
        assert_eq!(
            graph.get("astronomy").unwrap().memory_type,
            MemoryType::LongTerm
        );
        assert_eq!(graph.get("botany").unwrap().memory_type, MemoryType::ShortTerm);
        assert!(memory.long_term("astronomy").is_some());
        assert_eq!(report.clusters, 1);
    }

    #[test]
    fn test_consolidate_skips_non_short_term() {
        let mut graph = InterestGraph::default();
        let mut memory = consolidator();
        let now = Utc::now();
        strong_topic(&mut graph, "astronomy", now);

        memory.consolidate(&mut graph, now);
        let second = memory.consolidate(&mut graph, now);

        assert!(second.promoted.is_empty());
        assert_eq!(memory.long_term_entries().len(), 1);
        assert_eq!(memory.long_term("astronomy").unwrap().access_count, 50);
    }

    #[test]
    fn test_repromotion_merges() {
        let mut graph = InterestGraph::default();
        let mut memory = consolidator();
        let now = Utc::now();
        strong_topic(&mut graph, "astronomy", now);
        memory.consolidate(&mut graph, now);

        graph.remove("astronomy");
        strong_topic(&mut graph, "astronomy", now);
        let report = memory.consolidate(&mut graph, now);

        assert_eq!(report.promoted, vec!["astronomy".to_string()]);
        assert_eq!(memory.long_term_entries().len(), 1);
        assert_eq!(memory.long_term("astronomy").unwrap().access_count, 100);
    }

    #[test]
    fn test_faint_topics_reported_not_removed() {
        let config = GraphConfig {
            min_weight: 0.01,
            ..GraphConfig::default()
        };
        let mut graph = InterestGraph::new(config);
        let mut memory = consolidator();
        let start = Utc::now();
        graph.add_or_reinforce("botany", 0.0, start);
        graph.decay_tick(start + Duration::hours(25));

        let report = memory.consolidate(&mut graph, start + Duration::days(8));

        assert_eq!(report.forgotten, vec!["botany".to_string()]);
        assert!(graph.contains("botany"));
    }

    #[test]
    fn test_clusters_by_similarity_first_fit() {
        let now = Utc::now();
        let entry = |topic: &str| {
            let mut graph = InterestGraph::default();
            let node = graph.add_or_reinforce(topic, 0.0, now).unwrap().node;
            LongTermEntry::from_node(&node, now)
        };

        let mut memory = MemoryConsolidator::from_parts(
            MemoryConfig::default(),
            vec![
                entry("machine learning"),
                entry("volcano geology"),
                entry("deep learning"),
                entry("volcano eruptions"),
                entry("medieval poetry"),
            ],
            Vec::new(),
        );
        memory.cluster_memories();

        let clusters = memory.clusters();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].name, "machine learning");
        assert_eq!(clusters[0].members, vec!["machine learning", "deep learning"]);
        assert_eq!(clusters[1].members, vec!["volcano geology", "volcano eruptions"]);
        assert_eq!(clusters[2].members, vec!["medieval poetry"]);
        assert_eq!(
            memory.cluster_of("deep learning").map(|c| c.name.as_str()),
            Some("machine learning")
        );
    }

    #[test]
    fn test_clusters_pull_in_linked_topics() {
        let now = Utc::now();
        let mut graph = InterestGraph::default();
        graph.add_or_reinforce("jazz harmony", 0.0, now);
        graph.add_or_reinforce("volcano geology", 0.0, now);
        graph.connect(
            "jazz harmony",
            "volcano geology",
            0.5,
            interest_model::ConnectionOrigin::Dream,
            now,
        );

        let entries = ["jazz harmony", "volcano geology"]
            .iter()
            .map(|t| LongTermEntry::from_node(&graph.get(t).unwrap(), now))
            .collect();
        let mut memory =
            MemoryConsolidator::from_parts(MemoryConfig::default(), entries, Vec::new());
        memory.cluster_memories();

        assert_eq!(memory.clusters().len(), 1);
        assert_eq!(
            memory.clusters()[0].members,
            vec!["jazz harmony", "volcano geology"]
        );
    }

    #[test]
    fn test_stats_and_reset() {
        let mut graph = InterestGraph::default();
        let mut memory = consolidator();
        let now = Utc::now();
        strong_topic(&mut graph, "astronomy", now);
        memory.consolidate(&mut graph, now);

        let stats = memory.get_stats();
        assert_eq!(stats.long_term, 1);
        assert_eq!(stats.clusters, 1);
        assert_eq!(stats.largest_cluster, 1);

        memory.reset();
        assert_eq!(memory.get_stats(), MemoryStats::default());
    }
}
