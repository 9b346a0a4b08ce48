//! Record selection by time window and source.

use crate::models::ScoredRecord;
use chrono::{DateTime, Duration, Utc};

/// Criteria for narrowing a record set before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Keep records analyzed at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Keep records from this source only.
    pub source: Option<String>,
}

impl RecordFilter {
    /// Filter keeping the last `hours` hours before `now`.
    pub fn recent_hours(hours: u64, now: DateTime<Utc>) -> Self {
        let hours = i64::try_from(hours).unwrap_or(i64::MAX);
        let since = Duration::try_hours(hours).and_then(|d| now.checked_sub_signed(d));

        Self {
            since: Some(since.unwrap_or(DateTime::<Utc>::MIN_UTC)),
            source: None,
        }
    }

    /// Restrict to a single source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether the filter lets everything through.
    pub fn is_empty(&self) -> bool {
        self.since.is_none() && self.source.is_none()
    }

    /// Check a single record.
    ///
    /// With a `since` bound, records without `analyzed_at` never match.
    pub fn matches(&self, record: &ScoredRecord) -> bool {
        if let Some(since) = self.since {
            match record.analyzed_at {
                Some(ts) if ts >= since => {}
                _ => return false,
            }
        }

        match self.source.as_deref() {
            Some(source) => record.source_name() == source,
            None => true,
        }
    }

    /// Keep only the matching records.
    pub fn apply(&self, records: Vec<ScoredRecord>) -> Vec<ScoredRecord> {
        if self.is_empty() {
            return records;
        }
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
