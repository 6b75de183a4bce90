//! Memory module - long-term storage of interests that proved lasting.
//!
//! - **Consolidator**: scores short-term interests and promotes the best
//! - **Long-term store**: merged copies of promoted interests, in promotion order
//! - **Clusters**: first-fit grouping of long-term topics by keyword similarity
//! - **Retention**: an Ebbinghaus forgetting curve, available to policy hooks

mod consolidator;
mod long_term;
mod retention;

pub use consolidator::*;
pub use long_term::*;
pub use retention::*;
