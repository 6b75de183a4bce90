//! Tunables for every subsystem, loadable from TOML.
//!
//! Every section defaults field-by-field, so a file only needs to name the
//! values it overrides:
//!
//! ```toml
//! [graph]
//! core_threshold = 0.75
//!
//! [evolution]
//! population_size = 16
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Interest graph tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Weight of a freshly created interest.
    pub initial_weight: f64,
    /// Interests decaying below this weight are evicted.
    pub min_weight: f64,
    /// Upper bound for any interest weight.
    pub max_weight: f64,
    /// Weight at which an interest becomes core.
    pub core_threshold: f64,
    /// Base weight lost per hour of inactivity.
    pub decay_rate_per_hour: f64,
    pub core_decay_multiplier: f64,
    pub long_term_decay_multiplier: f64,
    /// Minimum keyword Jaccard index for an organic link.
    pub connection_threshold: f64,
    /// Weight given to an existing interest when a new one links to it.
    pub association_boost: f64,
    /// Fraction of a reinforcement gain spread to direct neighbors.
    pub reinforcement_factor: f64,
    /// Capacity before the weakest non-core interest is evicted.
    pub max_short_term_interests: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            initial_weight: 0.3,
            min_weight: 0.05,
            max_weight: 1.0,
            core_threshold: 0.8,
            decay_rate_per_hour: 0.01,
            core_decay_multiplier: 0.1,
            long_term_decay_multiplier: 0.3,
            connection_threshold: 0.2,
            association_boost: 0.05,
            reinforcement_factor: 0.3,
            max_short_term_interests: 50,
        }
    }
}

/// Memory consolidation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Minimum promotion score for a short-term interest.
    pub promotion_threshold: f64,
    /// Weight under which a short-term interest is reported as forgotten.
    pub forget_threshold: f64,
    /// Average similarity a topic needs to join an existing cluster.
    pub cluster_similarity_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: 0.6,
            forget_threshold: 0.1,
            cluster_similarity_threshold: 0.3,
        }
    }
}

/// Dream replay tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreamConfig {
    /// Interests required before a dream may start.
    pub min_interests: usize,
    pub chains_per_dream: usize,
    /// Maximum topics per replay chain.
    pub replay_chain_length: usize,
    /// Probability of following a link instead of jumping.
    pub follow_connection_probability: f64,
    /// Minimum dream similarity for a non-adjacent pair.
    pub connection_threshold: f64,
    /// Half of this is granted to both ends of a new dream link.
    pub serendipity_boost: f64,
    /// Flat boost when a dream rediscovers an existing link.
    pub existing_link_reinforcement: f64,
    pub max_insights: usize,
}

impl Default for DreamConfig {
    fn default() -> Self {
        Self {
            min_interests: 3,
            chains_per_dream: 10,
            replay_chain_length: 5,
            follow_connection_probability: 0.6,
            connection_threshold: 0.15,
            serendipity_boost: 0.2,
            existing_link_reinforcement: 0.05,
            max_insights: 5,
        }
    }
}

/// Strategy evolution tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Top genomes copied unchanged into the next generation.
    pub elitism_count: usize,
    pub crossover_rate: f64,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// Half-width of the additive noise applied to a mutated scalar gene.
    pub mutation_strength: f64,
    /// Multiplier applied to fitness on every recorded outcome.
    pub fitness_decay: f64,
    pub tournament_size: usize,
    /// Content sources a genome keeps a preference for.
    pub api_sources: Vec<String>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            elitism_count: 2,
            crossover_rate: 0.7,
            mutation_rate: 0.15,
            mutation_strength: 0.15,
            fitness_decay: 0.95,
            tournament_size: 3,
            api_sources: ["wikipedia", "hackernews", "reddit", "openlibrary"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CuriosityConfig {
    pub graph: GraphConfig,
    pub memory: MemoryConfig,
    pub dream: DreamConfig,
    pub evolution: EvolutionConfig,
}

impl CuriosityConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: CuriosityConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.graph;
        if !(0.0..g.max_weight).contains(&g.min_weight) {
            return Err(invalid("graph.min_weight", "must lie in [0, max_weight)"));
        }
        if g.initial_weight < g.min_weight || g.initial_weight > g.max_weight {
            return Err(invalid(
                "graph.initial_weight",
                "must lie in [min_weight, max_weight]",
            ));
        }
        if g.core_threshold <= g.min_weight || g.core_threshold > g.max_weight {
            return Err(invalid(
                "graph.core_threshold",
                "must lie in (min_weight, max_weight]",
            ));
        }
        if g.decay_rate_per_hour < 0.0 {
            return Err(invalid("graph.decay_rate_per_hour", "must not be negative"));
        }
        if g.max_short_term_interests == 0 {
            return Err(invalid("graph.max_short_term_interests", "must be positive"));
        }
        check_unit("graph.connection_threshold", g.connection_threshold)?;
        check_unit("graph.reinforcement_factor", g.reinforcement_factor)?;

        check_unit("memory.promotion_threshold", self.memory.promotion_threshold)?;
        check_unit(
            "memory.cluster_similarity_threshold",
            self.memory.cluster_similarity_threshold,
        )?;

        let d = &self.dream;
        if d.replay_chain_length < 2 {
            return Err(invalid("dream.replay_chain_length", "must be at least 2"));
        }
        check_unit(
            "dream.follow_connection_probability",
            d.follow_connection_probability,
        )?;
        check_unit("dream.connection_threshold", d.connection_threshold)?;

        let e = &self.evolution;
        if e.population_size == 0 {
            return Err(invalid("evolution.population_size", "must be positive"));
        }
        if e.elitism_count > e.population_size {
            return Err(invalid(
                "evolution.elitism_count",
                "cannot exceed population_size",
            ));
        }
        if e.tournament_size == 0 {
            return Err(invalid("evolution.tournament_size", "must be positive"));
        }
        check_unit("evolution.crossover_rate", e.crossover_rate)?;
        check_unit("evolution.mutation_rate", e.mutation_rate)?;
        check_unit("evolution.fitness_decay", e.fitness_decay)?;
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is outside [0, 1]", value)))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
