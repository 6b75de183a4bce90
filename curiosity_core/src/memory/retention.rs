//! Ebbinghaus-style retention curve.
//!
//! Available to policy hooks; consolidation does not consult it.

use chrono::Duration;
use interest_model::{HOURS_PER_DAY, SECONDS_PER_HOUR};

use crate::interest_graph::NodeView;

/// Memory strength: grows with rehearsal and with how connected a topic is.
pub fn retention_strength(access_count: u32, connection_count: usize) -> f64 {
    1.0 + 0.1 * access_count as f64 + 0.2 * connection_count as f64
}

/// Fraction of a memory retained after `elapsed`, in `(0, 1]`.
pub fn retention(node: &NodeView, elapsed: Duration) -> f64 {
    let hours = (elapsed.num_milliseconds().max(0) as f64 / 1000.0) / SECONDS_PER_HOUR;
    let strength = retention_strength(node.access_count, node.connection_count());
    (-hours / (strength * HOURS_PER_DAY)).exp()
}
