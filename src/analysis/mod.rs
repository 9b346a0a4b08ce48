//! Analysis modules.
//!
//! Pure aggregation over scored records: period and source grouping,
//! sentiment summaries, descriptive statistics and trend detection.

pub mod aggregator;
pub mod filter;
pub mod reductions;
pub mod trend;

pub use aggregator::*;
pub use filter::RecordFilter;
pub use trend::{calculate_trend, classify_direction, DEFAULT_WINDOW};
