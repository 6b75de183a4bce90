//! Outcome signals reported by the exploration collaborator.

use serde::{Deserialize, Serialize};

/// What one exploration run achieved while following a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplorationOutcome {
    /// New topics discovered.
    pub discoveries: u32,
    /// New links formed between interests.
    pub new_connections: u32,
    /// Existing interests reinforced.
    pub reinforced: u32,
    /// Fetches or explorations that produced nothing.
    pub failures: u32,
    /// Topics the user clicked on.
    pub user_clicks: u32,
}

impl ExplorationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discoveries(mut self, discoveries: u32) -> Self {
        self.discoveries = discoveries;
        self
    }

    pub fn with_new_connections(mut self, new_connections: u32) -> Self {
        self.new_connections = new_connections;
        self
    }

    pub fn with_reinforced(mut self, reinforced: u32) -> Self {
        self.reinforced = reinforced;
        self
    }

    pub fn with_failures(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_user_clicks(mut self, user_clicks: u32) -> Self {
        self.user_clicks = user_clicks;
        self
    }

    /// Instantaneous reward of this outcome, before blending into fitness.
    pub fn reward(&self) -> f64 {
        0.3 * self.discoveries as f64 + 0.5 * self.new_connections as f64
            + 0.1 * self.reinforced as f64
            - 0.2 * self.failures as f64
            + 0.4 * self.user_clicks as f64
    }
}
