//! # Curiosity Core
//!
//! The "mind" of the curiosity agent. This crate grows a weighted graph of
//! interests from what the agent reads, lets it fade with time, consolidates
//! what lasts into long-term memory, dreams up links it never saw directly,
//! and evolves the strategies it explores with.
//!
//! ## Core Components
//!
//! - **interest_graph**: Short-term attention as a self-linking, decaying topic graph
//! - **memory**: Promotion into long-term memory and semantic clustering
//! - **dream**: Randomized replay that discovers non-adjacent connections
//! - **evolution**: A genetic algorithm over exploration strategies
//! - **events**: Domain events for collaborators outside the core
//! - **snapshot**: Versioned persistence of every subsystem
//!
//! ## Design Philosophy
//!
//! - **Owned State**: Every subsystem is an explicit value; [`CuriosityEngine`] owns one of each
//! - **Event-Driven**: Collaborators subscribe to events instead of being called directly
//! - **Reproducible**: All randomness flows through an injected RNG, so seeded runs replay exactly

pub mod dream;
pub mod engine;
pub mod error;
pub mod events;
pub mod evolution;
pub mod interest_graph;
pub mod memory;
pub mod snapshot;

pub use dream::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use evolution::*;
pub use interest_graph::*;
pub use memory::*;
pub use snapshot::*;
