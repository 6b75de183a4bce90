//! # Interest Model
//!
//! Shared vocabulary for the curiosity engine: identifiers, memory tiers,
//! exploration outcomes, time helpers and the tunable configuration.
//! This crate holds no algorithms; `curiosity_core` builds the state
//! machines on top of it.

pub mod clock;
pub mod config;
pub mod ids;
pub mod memory_types;
pub mod outcome;

pub use clock::*;
pub use config::*;
pub use ids::*;
pub use memory_types::*;
pub use outcome::*;
