//! Data models for the sentiment aggregator.
//!
//! This module contains the input record type produced by the upstream
//! scoring pass and all the derived summaries computed from it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Default name of the timestamp field used for bucketing.
pub const DEFAULT_TIME_FIELD: &str = "analyzed_at";

/// Source name used when a record does not carry one.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One of the three known sentiment labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Sentiment {
    /// All known labels, in reporting order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    /// Parse an exact lowercase label. Anything else is an unknown label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// Returns the wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Returns an emoji representation of the sentiment.
    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::Positive => "🟢",
            Sentiment::Negative => "🔴",
            Sentiment::Neutral => "⚪",
        }
    }
}

/// Time-bucket size for period aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    #[default]
    Daily,
    Weekly,
}

impl Granularity {
    /// Resolve a granularity by name.
    ///
    /// Unrecognised names resolve to [`Granularity::Daily`] without an error.
    /// Callers rely on this: a bad period name yields daily buckets.
    pub fn from_name(name: &str) -> Self {
        match name {
            "hourly" => Granularity::Hourly,
            "weekly" => Granularity::Weekly,
            _ => Granularity::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single scored piece of text, as produced by the upstream sentiment model.
///
/// Every field except `text` is optional. Unrecognised fields are kept in
/// `extra` so that an alternative timestamp field can be selected at
/// aggregation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Original or truncated source text.
    #[serde(default)]
    pub text: String,
    /// Sentiment label, kept verbatim (may be outside the known set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Signed score in `[-1.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Model certainty in `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// When the scoring happened.
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub analyzed_at: Option<DateTime<Utc>>,
    /// Site or feed the text came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Any further fields carried by the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScoredRecord {
    /// Creates a fully-populated record.
    pub fn new(
        sentiment: &str,
        score: f64,
        confidence: f64,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sentiment: Some(sentiment.to_string()),
            score: Some(score),
            confidence: Some(confidence),
            analyzed_at: Some(analyzed_at),
            ..Self::default()
        }
    }

    /// Builder-style setter for the source name.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Source name, `"unknown"` when absent or empty.
    pub fn source_name(&self) -> &str {
        match self.source.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => UNKNOWN_SOURCE,
        }
    }

    /// Sentiment label as a string slice, if present.
    pub fn label(&self) -> Option<&str> {
        self.sentiment.as_deref()
    }

    /// Known sentiment, if the label is one of the three known values.
    pub fn known_sentiment(&self) -> Option<Sentiment> {
        self.label().and_then(Sentiment::from_label)
    }

    /// Look up a timestamp by field name.
    ///
    /// `analyzed_at` is read from the typed field; any other name is looked
    /// up in `extra`. Both accept a date/time string or unix seconds.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        if field == DEFAULT_TIME_FIELD {
            return self.analyzed_at;
        }

        self.extra.get(field).and_then(timestamp_from_value)
    }
}

/// Parse a timestamp string.
///
/// Accepts RFC 3339 and offset-less `YYYY-MM-DD[T ]HH:MM:SS[.f]` or bare
/// dates. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Read a timestamp from a JSON value: a string for [`parse_timestamp`] or
/// integer unix seconds.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => timestamp_from_value(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value))),
    }
}

/// Counts of the three known labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    /// Increment the count for a known label.
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Summary of all records falling into one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    /// Start of the bucket (hour, day or ISO week).
    pub period: DateTime<Utc>,
    /// Number of records in the bucket.
    pub total_items: usize,
    /// Counts of the known labels.
    pub sentiment_distribution: SentimentCounts,
    /// Mean over present scores, 0 if none.
    pub average_score: f64,
    /// Mean over present confidences, 0 if none.
    pub average_confidence: f64,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

/// Counts, percentages and dominant label of a group of labelled items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
    /// Most frequent label, which may be an unknown one.
    pub dominant: String,
    /// Raw item count, unknown labels included.
    pub total: usize,
}

impl Default for SentimentSummary {
    fn default() -> Self {
        Self {
            positive: 0,
            negative: 0,
            neutral: 0,
            positive_pct: 0.0,
            negative_pct: 0.0,
            neutral_pct: 0.0,
            dominant: Sentiment::Neutral.as_str().to_string(),
            total: 0,
        }
    }
}

impl SentimentSummary {
    /// Sum of the three known-label percentages.
    pub fn known_pct_total(&self) -> f64 {
        self.positive_pct + self.negative_pct + self.neutral_pct
    }
}

/// Per-source aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub total_items: usize,
    pub sentiment_summary: SentimentSummary,
    /// Latest analysis timestamp among the source's records.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Outcome class of a trend calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    InsufficientData,
    NoScores,
    Calculated,
}

impl fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStatus::InsufficientData => write!(f, "insufficient_data"),
            TrendStatus::NoScores => write!(f, "no_scores"),
            TrendStatus::Calculated => write!(f, "calculated"),
        }
    }
}

/// Direction of a trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Improving,
    Declining,
    Stable,
    /// Placeholder for results that could not be calculated.
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Improving => write!(f, "improving"),
            Direction::Declining => write!(f, "declining"),
            Direction::Stable => write!(f, "stable"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

impl Direction {
    pub fn emoji(&self) -> &'static str {
        match self {
            Direction::Improving => "📈",
            Direction::Declining => "📉",
            Direction::Stable => "➡️",
            Direction::Neutral => "❔",
        }
    }
}

/// Classification of the recent trajectory of a score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub trend: TrendStatus,
    /// Relative change in percent, 2 decimals.
    pub change_rate: f64,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_average: Option<f64>,
}

impl TrendResult {
    /// A non-calculated result with zero change and neutral direction.
    pub fn placeholder(trend: TrendStatus) -> Self {
        Self {
            trend,
            change_rate: 0.0,
            direction: Direction::Neutral,
            recent_average: None,
            previous_average: None,
        }
    }
}

/// Anything that carries a per-period average score.
pub trait AverageScore {
    fn average_score(&self) -> Option<f64>;
}

impl AverageScore for PeriodBucket {
    fn average_score(&self) -> Option<f64> {
        Some(self.average_score)
    }
}

impl AverageScore for f64 {
    fn average_score(&self) -> Option<f64> {
        Some(*self)
    }
}

impl AverageScore for Option<f64> {
    fn average_score(&self) -> Option<f64> {
        *self
    }
}

/// First and last analysis timestamps of a record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Descriptive statistics over present scores, 3 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// One-shot descriptive summary of a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_items: usize,
    pub date_range: DateRange,
    /// Count per label; the three known labels are always present.
    pub sentiment_totals: BTreeMap<String, usize>,
    pub score_stats: ScoreStats,
}

/// Overall sentiment of a batch of scored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSentiment {
    pub overall_sentiment: Sentiment,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub average_score: f64,
    pub average_confidence: f64,
    pub total_analyzed: usize,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Input file or directory the records came from.
    pub input: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of record files read.
    pub files_loaded: usize,
    /// Number of record files skipped because they failed to load.
    pub files_failed: usize,
    /// Records left after filtering.
    pub total_records: usize,
    pub granularity: Granularity,
    pub time_field: String,
    pub trend_window: usize,
    /// Source filter, if one was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<String>,
    /// Lower time bound, if one was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub metadata: ReportMetadata,
    pub overall: SummaryStatistics,
    pub sentiment: AggregateSentiment,
    pub periods: Vec<PeriodBucket>,
    pub sources: BTreeMap<String, SourceSummary>,
    pub trend: TrendResult,
}
