//! Markdown and JSON report generation.
//!
//! This module assembles a [`DashboardReport`] from a record set and renders
//! it as Markdown or JSON.

use crate::analysis::{
    aggregate_by_period, aggregate_by_source, aggregate_sentiment, busiest_sources,
    calculate_trend, summary_statistics,
};
use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{
    AggregateSentiment, DashboardReport, Granularity, PeriodBucket, ReportMetadata, ScoredRecord,
    Sentiment, SourceSummary, SummaryStatistics, TrendResult, TrendStatus,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Run every aggregation over `records` using the settings in `metadata`.
pub fn build_report(records: &[ScoredRecord], metadata: ReportMetadata) -> DashboardReport {
    let periods = aggregate_by_period(records, metadata.granularity, &metadata.time_field);
    let trend = calculate_trend(&periods, metadata.trend_window);

    DashboardReport {
        overall: summary_statistics(records),
        sentiment: aggregate_sentiment(records),
        sources: aggregate_by_source(records),
        periods,
        trend,
        metadata,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DashboardReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Sentiment Trend Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(options));
    output.push_str(&generate_overview_section(&report.sentiment, &report.overall));
    output.push_str(&generate_trend_section(&report.trend));

    if options.include_periods {
        output.push_str(&generate_periods_section(&report.periods, &report.metadata));
    }

    if options.include_sources {
        output.push_str(&generate_sources_section(&report.sources, options.max_sources));
    }

    output.push_str(&generate_footer());

    output
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn format_score(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.3}", s))
        .unwrap_or_else(|| "–".to_string())
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Loaded:** {}\n", metadata.files_loaded));
    if metadata.files_failed > 0 {
        section.push_str(&format!("- **Files Failed:** {}\n", metadata.files_failed));
    }
    section.push_str(&format!("- **Records:** {}\n", metadata.total_records));
    section.push_str(&format!(
        "- **Granularity:** {} (on `{}`)\n",
        metadata.granularity, metadata.time_field
    ));
    section.push_str(&format!(
        "- **Trend Window:** {} periods\n",
        metadata.trend_window
    ));
    if let Some(ref source) = metadata.source_filter {
        section.push_str(&format!("- **Source Filter:** {}\n", source));
    }
    if metadata.since.is_some() {
        section.push_str(&format!("- **Since:** {}\n", format_timestamp(metadata.since)));
    }
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(options: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Overview](#overview)\n");
    toc.push_str("- [Trend](#trend)\n");

    if options.include_periods {
        toc.push_str("- [Periods](#periods)\n");
    }
    if options.include_sources {
        toc.push_str("- [Sources](#sources)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the overview section.
fn generate_overview_section(sentiment: &AggregateSentiment, overall: &SummaryStatistics) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str(&format!(
        "**Overall sentiment:** {} {}\n\n",
        sentiment.overall_sentiment.emoji(),
        sentiment.overall_sentiment
    ));

    section.push_str(&format!(
        "| {} Positive | {} Negative | {} Neutral | **Total** |\n",
        Sentiment::Positive.emoji(),
        Sentiment::Negative.emoji(),
        Sentiment::Neutral.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        sentiment.positive_count,
        sentiment.negative_count,
        sentiment.neutral_count,
        sentiment.total_analyzed
    ));

    // Labels outside the known three
    let others: Vec<_> = overall
        .sentiment_totals
        .iter()
        .filter(|(label, count)| Sentiment::from_label(label).is_none() && **count > 0)
        .collect();
    if !others.is_empty() {
        section.push_str("Other labels: ");
        let listed: Vec<String> = others
            .iter()
            .map(|(label, count)| format!("`{}` ({})", label, count))
            .collect();
        section.push_str(&listed.join(", "));
        section.push_str("\n\n");
    }

    section.push_str("### Score Statistics\n\n");
    section.push_str("| Mean | Std | Min | Max | Avg. Confidence |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |\n\n",
        overall.score_stats.mean,
        overall.score_stats.std,
        overall.score_stats.min,
        overall.score_stats.max,
        sentiment.average_confidence
    ));

    section.push_str(&format!(
        "*Date range: {} → {}*\n\n",
        format_timestamp(overall.date_range.start),
        format_timestamp(overall.date_range.end)
    ));

    section
}

/// Generate the trend section.
fn generate_trend_section(trend: &TrendResult) -> String {
    let mut section = String::new();

    section.push_str("## Trend\n\n");

    match trend.trend {
        TrendStatus::InsufficientData => {
            section.push_str("Not enough periods to calculate a trend.\n\n");
        }
        TrendStatus::NoScores => {
            section.push_str("No period carries an average score; no trend calculated.\n\n");
        }
        TrendStatus::Calculated => {
            section.push_str(&format!(
                "**Direction:** {} {} ({:+.2}%)\n\n",
                trend.direction.emoji(),
                trend.direction,
                trend.change_rate
            ));
            section.push_str(&format!(
                "- **Recent average:** {}\n",
                format_score(trend.recent_average)
            ));
            section.push_str(&format!(
                "- **Previous average:** {}\n\n",
                format_score(trend.previous_average)
            ));
        }
    }

    section
}

/// Generate the per-period table.
fn generate_periods_section(periods: &[PeriodBucket], metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Periods\n\n");

    if periods.is_empty() {
        section.push_str(&format!(
            "No records carry a `{}` timestamp.\n\n",
            metadata.time_field
        ));
        return section;
    }

    section.push_str("| Period | Items | + | − | ○ | Avg. Score | Avg. Confidence | Min | Max |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    let format = match metadata.granularity {
        Granularity::Hourly => "%Y-%m-%d %H:00",
        Granularity::Daily => "%Y-%m-%d",
        Granularity::Weekly => "week of %Y-%m-%d",
    };

    for bucket in periods {
        let dist = &bucket.sentiment_distribution;
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.3} | {:.3} | {} | {} |\n",
            bucket.period.format(format),
            bucket.total_items,
            dist.positive,
            dist.negative,
            dist.neutral,
            bucket.average_score,
            bucket.average_confidence,
            format_score(bucket.min_score),
            format_score(bucket.max_score),
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-source table.
fn generate_sources_section(sources: &BTreeMap<String, SourceSummary>, limit: usize) -> String {
    let mut section = String::new();

    section.push_str("## Sources\n\n");

    if sources.is_empty() {
        section.push_str("No sources.\n\n");
        return section;
    }

    section.push_str("| Source | Items | Positive | Negative | Neutral | Dominant | Last Updated |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---|\n");

    for (name, summary) in busiest_sources(sources, limit) {
        let s = &summary.sentiment_summary;
        section.push_str(&format!(
            "| {} | {} | {} ({:.1}%) | {} ({:.1}%) | {} ({:.1}%) | {} | {} |\n",
            name,
            summary.total_items,
            s.positive,
            s.positive_pct,
            s.negative,
            s.negative_pct,
            s.neutral,
            s.neutral_pct,
            s.dominant,
            format_timestamp(summary.last_updated),
        ));
    }

    if sources.len() > limit {
        section.push_str(&format!(
            "\n*{} more sources not shown.*\n",
            sources.len() - limit
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by sentitrend v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Render the report in the requested format.
pub fn render_report(
    report: &DashboardReport,
    format: OutputFormat,
    options: &ReportConfig,
) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, options)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Render the report and write it to a file.
pub fn write_report(
    report: &DashboardReport,
    format: OutputFormat,
    options: &ReportConfig,
    path: &Path,
) -> Result<()> {
    let content = render_report(report, format, options)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DashboardReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
