//! Memory tiers and link origins.

use serde::{Deserialize, Serialize};

/// The memory tier an interest currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemoryType {
    /// Freshly discovered, decays at the base rate.
    #[default]
    ShortTerm,
    /// Promoted by consolidation, or demoted from core.
    LongTerm,
    /// Weight has crossed the core threshold.
    Core,
}

impl MemoryType {
    /// Decay multiplier for this tier, given the configured core and long-term factors.
    pub fn decay_multiplier(&self, core: f64, long_term: f64) -> f64 {
        match self {
            MemoryType::ShortTerm => 1.0,
            MemoryType::LongTerm => long_term,
            MemoryType::Core => core,
        }
    }

    /// Tier a node should occupy after its weight changed.
    ///
    /// Crossing the threshold upward always yields `Core`. Leaving `Core`
    /// lands in `LongTerm`; there is no direct path back to `ShortTerm`.
    pub fn after_weight_change(self, weight: f64, core_threshold: f64) -> MemoryType {
        if weight >= core_threshold {
            MemoryType::Core
        } else if self == MemoryType::Core {
            MemoryType::LongTerm
        } else {
            self
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemoryType::ShortTerm => "short_term",
            MemoryType::LongTerm => "long_term",
            MemoryType::Core => "core",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a link between two interests came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionOrigin {
    /// Keyword overlap found when a topic was inserted.
    Organic,
    /// Non-adjacent similarity found during dream replay.
    Dream,
}
