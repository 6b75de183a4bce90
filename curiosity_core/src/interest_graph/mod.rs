//! Interest Graph module - the agent's short-term attention.
//!
//! The graph consists of:
//! - **Nodes**: normalized topics with a decaying weight and a memory tier
//! - **Links**: symmetric adjacency discovered by keyword overlap or dreaming
//! - **Connection log**: an append-only record of how links came to be

mod graph;
mod keywords;
mod node;

#[cfg(test)]
mod proptest;

pub use graph::*;
pub use keywords::*;
pub use node::*;
