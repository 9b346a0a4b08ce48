//! Sentitrend - time-bucketed sentiment aggregation and trend detection.
//!
//! The [`analysis`] module is the engine: pure functions that group scored
//! records by period and source, summarize them, and classify the recent
//! trend of per-period average scores. The remaining modules load records
//! from disk and render reports for the `sentitrend` binary.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod loader;
pub mod models;
pub mod report;

pub use analysis::{
    aggregate_by_period, aggregate_by_source, aggregate_sentiment, calculate_trend, summarize,
    summary_statistics, RecordFilter,
};
pub use models::{Granularity, PeriodBucket, ScoredRecord, SourceSummary, TrendResult};
