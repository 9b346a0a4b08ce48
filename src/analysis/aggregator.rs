//! Sentiment aggregation and statistics.
//!
//! This module groups scored records by time period and by source, and
//! reduces groups to distributional summaries. Every function here is a pure
//! computation over its input; bad or missing data degrades to empty or
//! zeroed results instead of an error.

use super::reductions::{mean, round_to, Reduction};
use crate::models::{
    AggregateSentiment, DateRange, Granularity, PeriodBucket, ScoreStats, ScoredRecord,
    Sentiment, SentimentCounts, SentimentSummary, SourceSummary, SummaryStatistics,
};
use chrono::{DateTime, Datelike, Days, Timelike, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mean score above which a batch counts as positive overall.
pub const OVERALL_POSITIVE_THRESHOLD: f64 = 0.2;

/// Mean score below which a batch counts as negative overall.
pub const OVERALL_NEGATIVE_THRESHOLD: f64 = -0.2;

/// Truncate a timestamp to the start of its bucket.
pub fn period_start(ts: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    let date = ts.date_naive();

    let start = match granularity {
        Granularity::Hourly => date.and_hms_opt(ts.hour(), 0, 0),
        Granularity::Daily => date.and_hms_opt(0, 0, 0),
        Granularity::Weekly => date
            .checked_sub_days(Days::new(u64::from(ts.weekday().num_days_from_monday())))
            .and_then(|monday| monday.and_hms_opt(0, 0, 0)),
    };

    start.map(|naive| naive.and_utc()).unwrap_or(ts)
}

/// Group records into calendar periods and summarize each period.
///
/// Returns buckets in strictly ascending `period` order. If no record
/// carries `time_field` the result is empty and a warning is logged.
pub fn aggregate_by_period(
    records: &[ScoredRecord],
    granularity: Granularity,
    time_field: &str,
) -> Vec<PeriodBucket> {
    if records.is_empty() {
        return Vec::new();
    }

    if !records.iter().any(|r| r.timestamp(time_field).is_some()) {
        warn!("Time field '{}' not found in data", time_field);
        return Vec::new();
    }

    let mut grouped: BTreeMap<DateTime<Utc>, Vec<&ScoredRecord>> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records {
        match record.timestamp(time_field) {
            Some(ts) => grouped
                .entry(period_start(ts, granularity))
                .or_default()
                .push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            "Skipped {} records without '{}' during {} aggregation",
            skipped, time_field, granularity
        );
    }

    grouped
        .into_iter()
        .map(|(period, group)| aggregate_group(period, &group))
        .collect()
}

/// Reduce one bucket of records to a [`PeriodBucket`].
fn aggregate_group(period: DateTime<Utc>, group: &[&ScoredRecord]) -> PeriodBucket {
    let mut distribution = SentimentCounts::default();
    for sentiment in group.iter().filter_map(|r| r.known_sentiment()) {
        distribution.record(sentiment);
    }

    let scores: Vec<f64> = group.iter().filter_map(|r| r.score).collect();
    let confidences: Vec<f64> = group.iter().filter_map(|r| r.confidence).collect();

    PeriodBucket {
        period,
        total_items: group.len(),
        sentiment_distribution: distribution,
        average_score: Reduction::Mean.apply(&scores).unwrap_or(0.0),
        average_confidence: Reduction::Mean.apply(&confidences).unwrap_or(0.0),
        min_score: Reduction::Min.apply(&scores),
        max_score: Reduction::Max.apply(&scores),
    }
}

/// Partition records by source and summarize each partition.
pub fn aggregate_by_source(records: &[ScoredRecord]) -> BTreeMap<String, SourceSummary> {
    let mut by_source: BTreeMap<&str, Vec<&ScoredRecord>> = BTreeMap::new();

    for record in records {
        by_source
            .entry(record.source_name())
            .or_default()
            .push(record);
    }

    by_source
        .into_iter()
        .map(|(source, items)| {
            let summary = SourceSummary {
                total_items: items.len(),
                sentiment_summary: summarize(items.iter().filter_map(|r| r.label())),
                last_updated: items.iter().filter_map(|r| r.analyzed_at).max(),
            };
            (source.to_string(), summary)
        })
        .collect()
}

/// Summarize a collection of sentiment labels.
///
/// Labels outside the known three are counted in `total` and can be
/// `dominant`, but they have no percentage of their own, so the known
/// percentages then add up to less than 100. Ties for `dominant` go to the
/// label seen first.
pub fn summarize<'a, I>(labels: I) -> SentimentSummary
where
    I: IntoIterator<Item = &'a str>,
{
    // Insertion-ordered so that the dominant tie-break is first-seen.
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    if counts.is_empty() {
        return SentimentSummary::default();
    }

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let count_of = |sentiment: Sentiment| {
        counts
            .iter()
            .find(|(label, _)| *label == sentiment.as_str())
            .map_or(0, |(_, c)| *c)
    };
    let pct = |count: usize| round_to(count as f64 / total as f64 * 100.0, 1);

    let mut dominant = counts[0];
    for &(label, count) in &counts[1..] {
        if count > dominant.1 {
            dominant = (label, count);
        }
    }

    let positive = count_of(Sentiment::Positive);
    let negative = count_of(Sentiment::Negative);
    let neutral = count_of(Sentiment::Neutral);

    SentimentSummary {
        positive,
        negative,
        neutral,
        positive_pct: pct(positive),
        negative_pct: pct(negative),
        neutral_pct: pct(neutral),
        dominant: dominant.0.to_string(),
        total,
    }
}

/// Overall sentiment of a batch, classified from the mean score.
pub fn aggregate_sentiment(records: &[ScoredRecord]) -> AggregateSentiment {
    let mut counts = SentimentCounts::default();
    for sentiment in records.iter().filter_map(|r| r.known_sentiment()) {
        counts.record(sentiment);
    }

    let scores: Vec<f64> = records.iter().filter_map(|r| r.score).collect();
    let confidences: Vec<f64> = records.iter().filter_map(|r| r.confidence).collect();
    let average_score = mean(&scores);

    let overall_sentiment = if average_score > OVERALL_POSITIVE_THRESHOLD {
        Sentiment::Positive
    } else if average_score < OVERALL_NEGATIVE_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    AggregateSentiment {
        overall_sentiment,
        positive_count: counts.positive,
        negative_count: counts.negative,
        neutral_count: counts.neutral,
        average_score: round_to(average_score, 3),
        average_confidence: round_to(mean(&confidences), 3),
        total_analyzed: records.len(),
    }
}

/// Descriptive statistics over a record set.
pub fn summary_statistics(records: &[ScoredRecord]) -> SummaryStatistics {
    let mut sentiment_totals: BTreeMap<String, usize> = Sentiment::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();

    for label in records.iter().filter_map(|r| r.label()) {
        *sentiment_totals.entry(label.to_string()).or_insert(0) += 1;
    }

    let timestamps = || records.iter().filter_map(|r| r.analyzed_at);
    let date_range = DateRange {
        start: timestamps().min(),
        end: timestamps().max(),
    };

    let scores: Vec<f64> = records.iter().filter_map(|r| r.score).collect();

    SummaryStatistics {
        total_items: records.len(),
        date_range,
        sentiment_totals,
        score_stats: score_stats(&scores),
    }
}

/// Mean, sample standard deviation and extrema, rounded to 3 decimals.
fn score_stats(scores: &[f64]) -> ScoreStats {
    if scores.is_empty() {
        return ScoreStats::default();
    }

    let avg = mean(scores);
    let std = if scores.len() > 1 {
        let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>()
            / (scores.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    ScoreStats {
        mean: round_to(avg, 3),
        std: round_to(std, 3),
        min: round_to(Reduction::Min.apply(scores).unwrap_or(0.0), 3),
        max: round_to(Reduction::Max.apply(scores).unwrap_or(0.0), 3),
    }
}

/// Identify the `n` sources with the most items.
pub fn busiest_sources(
    sources: &BTreeMap<String, SourceSummary>,
    n: usize,
) -> Vec<(&str, &SourceSummary)> {
    let mut ranked: Vec<_> = sources.iter().map(|(k, v)| (k.as_str(), v)).collect();
    ranked.sort_by_key(|(_, summary)| std::cmp::Reverse(summary.total_items));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn labelled(label: &str) -> ScoredRecord {
        ScoredRecord {
            sentiment: Some(label.to_string()),
            ..ScoredRecord::default()
        }
    }

    fn three_record_scenario() -> Vec<ScoredRecord> {
        vec![
            ScoredRecord::new("positive", 0.8, 0.9, at(2024, 1, 1, 9)),
            ScoredRecord::new("negative", -0.6, 0.7, at(2024, 1, 1, 17)),
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 1, 2, 12)),
        ]
    }

    #[test]
    fn test_daily_two_bucket_scenario() {
        let buckets =
            aggregate_by_period(&three_record_scenario(), Granularity::Daily, "analyzed_at");

        assert_eq!(buckets.len(), 2);

        let day1 = &buckets[0];
        assert_eq!(day1.period, at(2024, 1, 1, 0));
        assert_eq!(day1.total_items, 2);
        assert_eq!(
            day1.sentiment_distribution,
            SentimentCounts { positive: 1, negative: 1, neutral: 0 }
        );
        assert!((day1.average_score - 0.1).abs() < 1e-9);
        assert!((day1.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(day1.min_score, Some(-0.6));
        assert_eq!(day1.max_score, Some(0.8));

        let day2 = &buckets[1];
        assert_eq!(day2.period, at(2024, 1, 2, 0));
        assert_eq!(day2.total_items, 1);
        assert_eq!(
            day2.sentiment_distribution,
            SentimentCounts { positive: 0, negative: 0, neutral: 1 }
        );
        assert_eq!(day2.average_score, 0.0);
    }

    #[test]
    fn test_period_start_truncation() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 4, 15, 42, 17).unwrap(); // Thursday

        assert_eq!(period_start(ts, Granularity::Hourly), at(2024, 1, 4, 15));
        assert_eq!(period_start(ts, Granularity::Daily), at(2024, 1, 4, 0));
        assert_eq!(period_start(ts, Granularity::Weekly), at(2024, 1, 1, 0));

        // Sunday belongs to the week starting the previous Monday.
        let sunday = at(2024, 1, 7, 23);
        assert_eq!(period_start(sunday, Granularity::Weekly), at(2024, 1, 1, 0));

        // ISO week crossing a year boundary.
        let new_year = at(2025, 1, 1, 8);
        assert_eq!(period_start(new_year, Granularity::Weekly), at(2024, 12, 30, 0));
    }

    #[test]
    fn test_weekly_and_hourly_buckets() {
        let records = vec![
            ScoredRecord::new("positive", 0.5, 0.9, at(2024, 1, 1, 10)),
            ScoredRecord::new("positive", 0.7, 0.9, at(2024, 1, 3, 10)),
            ScoredRecord::new("negative", -0.4, 0.9, at(2024, 1, 8, 10)),
            ScoredRecord::new("negative", -0.2, 0.9, at(2024, 1, 8, 10)),
        ];

        let weekly = aggregate_by_period(&records, Granularity::Weekly, "analyzed_at");
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].total_items, 2);
        assert_eq!(weekly[1].period, at(2024, 1, 8, 0));

        let hourly = aggregate_by_period(&records, Granularity::Hourly, "analyzed_at");
        assert_eq!(hourly.len(), 3);
        assert_eq!(hourly[2].period, at(2024, 1, 8, 10));
        assert_eq!(hourly[2].total_items, 2);
    }

    #[test]
    fn test_unknown_granularity_partitions_daily() {
        let records = three_record_scenario();
        let fallback =
            aggregate_by_period(&records, Granularity::from_name("fortnightly"), "analyzed_at");
        let daily = aggregate_by_period(&records, Granularity::Daily, "analyzed_at");

        assert_eq!(fallback, daily);
        let total: usize = fallback.iter().map(|b| b.total_items).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn test_period_ordering_is_strictly_ascending() {
        let records = vec![
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 3, 9, 1)),
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 1, 2, 1)),
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 2, 5, 1)),
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 1, 2, 23)),
            ScoredRecord::new("neutral", 0.0, 0.5, at(2023, 12, 31, 1)),
        ];

        let buckets = aggregate_by_period(&records, Granularity::Daily, "analyzed_at");
        assert_eq!(buckets.len(), 4);
        assert!(buckets.windows(2).all(|w| w[0].period < w[1].period));
        assert_eq!(buckets.iter().map(|b| b.total_items).sum::<usize>(), records.len());
    }

    #[test]
    fn test_missing_time_field_yields_empty() {
        let records = three_record_scenario();
        assert!(aggregate_by_period(&records, Granularity::Daily, "scraped_at").is_empty());
        assert!(aggregate_by_period(&[], Granularity::Daily, "analyzed_at").is_empty());
    }

    #[test]
    fn test_alternate_time_field() {
        let mut records = three_record_scenario();
        for record in &mut records {
            record
                .extra
                .insert("scraped_at".to_string(), "2024-02-10T08:00:00".into());
        }

        let buckets = aggregate_by_period(&records, Granularity::Daily, "scraped_at");
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].period, at(2024, 2, 10, 0));
        assert_eq!(buckets[0].total_items, 3);
    }

    #[test]
    fn test_missing_fields_excluded_from_averages() {
        let mut partial = ScoredRecord::new("positive", 0.4, 0.8, at(2024, 1, 1, 1));
        partial.confidence = None;
        let mut unscored = ScoredRecord::new("mystery", 0.0, 0.2, at(2024, 1, 1, 2));
        unscored.score = None;

        let buckets =
            aggregate_by_period(&[partial, unscored], Granularity::Daily, "analyzed_at");

        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[0];
        assert_eq!(bucket.total_items, 2);
        assert_eq!(bucket.sentiment_distribution.total(), 1);
        assert_eq!(bucket.average_score, 0.4);
        assert_eq!(bucket.average_confidence, 0.2);
    }

    #[test]
    fn test_bucket_without_scores() {
        let record = ScoredRecord {
            sentiment: Some("neutral".to_string()),
            analyzed_at: Some(at(2024, 1, 1, 1)),
            ..ScoredRecord::default()
        };

        let buckets = aggregate_by_period(&[record], Granularity::Daily, "analyzed_at");
        assert_eq!(buckets[0].average_score, 0.0);
        assert_eq!(buckets[0].average_confidence, 0.0);
        assert_eq!(buckets[0].min_score, None);
        assert_eq!(buckets[0].max_score, None);
    }

    #[test]
    fn test_aggregate_by_source() {
        let mut no_time = labelled("negative").with_source("feed");
        no_time.analyzed_at = None;

        let records = vec![
            ScoredRecord::new("positive", 0.9, 0.9, at(2024, 1, 1, 1)).with_source("feed"),
            ScoredRecord::new("positive", 0.7, 0.9, at(2024, 1, 3, 1)).with_source("feed"),
            no_time,
            ScoredRecord::new("neutral", 0.0, 0.5, at(2024, 1, 2, 1)),
            ScoredRecord::new("negative", -0.5, 0.5, at(2024, 1, 2, 1)).with_source(""),
        ];

        let sources = aggregate_by_source(&records);
        assert_eq!(sources.len(), 2);

        let feed = &sources["feed"];
        assert_eq!(feed.total_items, 3);
        assert_eq!(feed.sentiment_summary.positive, 2);
        assert_eq!(feed.sentiment_summary.negative, 1);
        assert_eq!(feed.sentiment_summary.dominant, "positive");
        assert_eq!(feed.last_updated, Some(at(2024, 1, 3, 1)));

        let unknown = &sources["unknown"];
        assert_eq!(unknown.total_items, 2);

        let total: usize = sources.values().map(|s| s.total_items).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn test_source_without_timestamps() {
        let sources = aggregate_by_source(&[labelled("neutral").with_source("rss")]);
        assert_eq!(sources["rss"].last_updated, None);
        assert!(aggregate_by_source(&[]).is_empty());
    }

    #[test]
    fn test_source_with_unlabelled_records() {
        let sources = aggregate_by_source(&[ScoredRecord::default().with_source("blog")]);
        let blog = &sources["blog"];

        assert_eq!(blog.total_items, 1);
        assert_eq!(blog.sentiment_summary, SentimentSummary::default());
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(std::iter::empty());

        assert_eq!(summary.positive, 0);
        assert_eq!(summary.negative, 0);
        assert_eq!(summary.neutral, 0);
        assert_eq!(summary.dominant, "neutral");
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_summarize_percentages() {
        let summary = summarize(["positive", "negative", "neutral", "positive"]);

        assert_eq!(summary.positive, 2);
        assert_eq!(summary.positive_pct, 50.0);
        assert_eq!(summary.negative_pct, 25.0);
        assert_eq!(summary.neutral_pct, 25.0);
        assert_eq!(summary.dominant, "positive");
        assert!((summary.known_pct_total() - 100.0).abs() <= 0.1);
    }

    #[test]
    fn test_summarize_thirds_within_tolerance() {
        let summary = summarize(["positive", "negative", "neutral"]);

        assert_eq!(summary.positive_pct, 33.3);
        assert!((summary.known_pct_total() - 100.0).abs() <= 0.1 + 1e-9);
    }

    #[test]
    fn test_summarize_unknown_labels_leave_gap() {
        let summary = summarize(["positive", "mixed", "mixed", "negative", "mixed"]);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.positive, 1);
        assert_eq!(summary.negative, 1);
        assert_eq!(summary.dominant, "mixed");
        assert!(summary.known_pct_total() < 100.0);
        assert_eq!(summary.known_pct_total(), 40.0);
    }

    #[test]
    fn test_summarize_tie_goes_to_first_seen() {
        assert_eq!(summarize(["negative", "positive"]).dominant, "negative");
        assert_eq!(summarize(["positive", "negative"]).dominant, "positive");
        assert_eq!(
            summarize(["neutral", "positive", "positive", "neutral"]).dominant,
            "neutral"
        );
    }

    #[test]
    fn test_aggregate_sentiment() {
        let records = vec![
            ScoredRecord::new("positive", 0.9, 0.95, at(2024, 1, 1, 1)),
            ScoredRecord::new("positive", 0.6, 0.85, at(2024, 1, 1, 2)),
            ScoredRecord::new("negative", -0.3, 0.6, at(2024, 1, 1, 3)),
        ];

        let aggregate = aggregate_sentiment(&records);
        assert_eq!(aggregate.overall_sentiment, Sentiment::Positive);
        assert_eq!(aggregate.positive_count, 2);
        assert_eq!(aggregate.negative_count, 1);
        assert_eq!(aggregate.neutral_count, 0);
        assert_eq!(aggregate.average_score, 0.4);
        assert_eq!(aggregate.average_confidence, 0.8);
        assert_eq!(aggregate.total_analyzed, 3);
    }

    #[test]
    fn test_aggregate_sentiment_thresholds() {
        let mild = vec![ScoredRecord::new("positive", 0.2, 0.9, at(2024, 1, 1, 1))];
        assert_eq!(aggregate_sentiment(&mild).overall_sentiment, Sentiment::Neutral);

        let gloomy = vec![ScoredRecord::new("negative", -0.25, 0.9, at(2024, 1, 1, 1))];
        assert_eq!(aggregate_sentiment(&gloomy).overall_sentiment, Sentiment::Negative);

        let empty = aggregate_sentiment(&[]);
        assert_eq!(empty.overall_sentiment, Sentiment::Neutral);
        assert_eq!(empty.total_analyzed, 0);
        assert_eq!(empty.average_score, 0.0);
    }

    #[test]
    fn test_summary_statistics() {
        let records = vec![
            ScoredRecord::new("positive", 0.5, 0.9, at(2024, 1, 2, 1)),
            ScoredRecord::new("negative", -0.5, 0.9, at(2024, 1, 1, 1)),
            ScoredRecord::new("neutral", 0.0, 0.9, at(2024, 1, 5, 1)),
            labelled("mixed"),
        ];

        let stats = summary_statistics(&records);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.date_range.start, Some(at(2024, 1, 1, 1)));
        assert_eq!(stats.date_range.end, Some(at(2024, 1, 5, 1)));
        assert_eq!(stats.sentiment_totals["positive"], 1);
        assert_eq!(stats.sentiment_totals["mixed"], 1);
        assert_eq!(stats.score_stats.mean, 0.0);
        assert_eq!(stats.score_stats.std, 0.5);
        assert_eq!(stats.score_stats.min, -0.5);
        assert_eq!(stats.score_stats.max, 0.5);
    }

    #[test]
    fn test_summary_statistics_degenerate_inputs() {
        let empty = summary_statistics(&[]);
        assert_eq!(empty.total_items, 0);
        assert_eq!(empty.date_range, DateRange::default());
        assert_eq!(empty.sentiment_totals["neutral"], 0);
        assert_eq!(empty.score_stats, ScoreStats::default());

        let single =
            summary_statistics(&[ScoredRecord::new("positive", 0.75, 0.9, at(2024, 1, 1, 1))]);
        assert_eq!(single.score_stats.std, 0.0);
        assert_eq!(single.score_stats.mean, 0.75);
        assert_eq!(single.score_stats.min, 0.75);
    }

    #[test]
    fn test_busiest_sources() {
        let records = vec![
            labelled("positive").with_source("a"),
            labelled("positive").with_source("b"),
            labelled("positive").with_source("b"),
            labelled("positive").with_source("c"),
            labelled("positive").with_source("c"),
            labelled("positive").with_source("c"),
        ];

        let sources = aggregate_by_source(&records);
        let top = busiest_sources(&sources, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "c");
        assert_eq!(top[1].0, "b");
    }
}
