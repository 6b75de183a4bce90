//! Error types for the curiosity core.
//!
//! Precondition failures (`DreamError`, `EvolutionError`) tell the caller an
//! operation was not performed; nothing was changed. Snapshot errors abort an
//! import before any state is replaced.

use interest_model::ConfigError;
use thiserror::Error;

/// Crate-level error.
#[derive(Error, Debug)]
pub enum CuriosityError {
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a dream session was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DreamError {
    #[error("Not enough interests to dream: {available} available, {required} required")]
    NotEnoughInterests { available: usize, required: usize },

    #[error("A dream session is already running")]
    AlreadyDreaming,
}

/// Reasons a generation step was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvolutionError {
    #[error("Population too small to evolve: {size} genome(s), at least 2 required")]
    PopulationTooSmall { size: usize },
}

/// Failures while restoring persisted state.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Incompatible {subsystem} snapshot: version {found}, expected {expected}")]
    IncompatibleVersion {
        subsystem: &'static str,
        found: u32,
        expected: u32,
    },

    #[error("Malformed {subsystem} snapshot: {source}")]
    Malformed {
        subsystem: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for curiosity operations
pub type Result<T> = std::result::Result<T, CuriosityError>;
