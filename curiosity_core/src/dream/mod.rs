//! Dream module - offline replay that discovers links the graph missed.
//!
//! A session replays several random walks ("chains") over the interest graph.
//! Topics that are not neighbors in a walk but score high on dream similarity
//! get linked; pairs already linked are strengthened instead. Recurring topics
//! and chain midpoints are reported as insights.

mod chain;
mod replay;
mod session;

pub use chain::*;
pub use replay::*;
pub use session::*;
