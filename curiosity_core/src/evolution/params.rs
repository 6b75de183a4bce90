//! Mapping from genes to the knobs an explorer actually turns.

use serde::{Deserialize, Serialize};

use super::Genes;

/// Most topics a single exploration may chase.
pub const MAX_TOPICS_PER_EXPLORATION: usize = 5;
/// Width of the preferred activity window, in hours.
pub const PREFERRED_WINDOW_HOURS: u32 = 6;

/// Concrete exploration behavior derived from a genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationParameters {
    /// Content sources, most preferred first.
    pub source_order: Vec<String>,
    /// Probability of exploring on a scheduler tick.
    pub exploration_rate: f64,
    pub topics_per_exploration: usize,
    pub recency_weight: f64,
    pub connection_affinity: f64,
    /// Minimum novelty a candidate topic needs; low for novelty seekers.
    pub novelty_threshold: f64,
    /// First hour (0-23) of the preferred activity window.
    pub preferred_hour_start: u32,
    pub risk_tolerance: f64,
    pub memory_influence: f64,
    /// Probability of picking a random topic instead of a planned one.
    pub serendipity_rate: f64,
}

impl ExplorationParameters {
    pub fn from_genes(genes: &Genes) -> Self {
        let mut sources: Vec<(&String, f64)> = genes
            .api_preferences
            .iter()
            .map(|(name, &pref)| (name, pref))
            .collect();
        sources.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let extra_topics = (genes.breadth_preference * (MAX_TOPICS_PER_EXPLORATION - 1) as f64)
            .round() as usize;

        Self {
            source_order: sources.into_iter().map(|(name, _)| name.clone()).collect(),
            exploration_rate: genes.exploration_bias,
            topics_per_exploration: (1 + extra_topics).min(MAX_TOPICS_PER_EXPLORATION),
            recency_weight: genes.recency_weight,
            connection_affinity: genes.connection_affinity,
            novelty_threshold: 1.0 - genes.novelty_seeking,
            preferred_hour_start: ((genes.time_preference * 24.0).floor() as u32) % 24,
            risk_tolerance: genes.risk_tolerance,
            memory_influence: genes.memory_influence,
            serendipity_rate: genes.serendipity_factor,
        }
    }

    /// True if `hour` (0-23) falls inside the preferred window, which may
    /// wrap past midnight.
    pub fn prefers_hour(&self, hour: u32) -> bool {
        let offset = (hour % 24 + 24 - self.preferred_hour_start) % 24;
        offset < PREFERRED_WINDOW_HOURS
    }
}
