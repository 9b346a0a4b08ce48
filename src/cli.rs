//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::GeneralConfig;
use clap::Parser;
use std::path::PathBuf;

/// Sentitrend - sentiment aggregation and trend reports
///
/// Buckets scored records by hour, day or week, summarizes them per
/// period and per source, and classifies the recent score trend.
///
/// Examples:
///   sentitrend --input results.json
///   sentitrend --input ./exports --granularity weekly --format json
///   sentitrend --input feed.jsonl --source reuters --since-hours 48
///   sentitrend --input ./exports --dry-run
///   sentitrend --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Record file or directory of record files
    ///
    /// Accepts .json (array or {"records": [...]}) and .jsonl files.
    #[arg(short, long, value_name = "PATH", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Time bucket size (hourly, daily, weekly)
    ///
    /// Any other value falls back to daily.
    #[arg(short, long, value_name = "PERIOD", env = "SENTITREND_GRANULARITY")]
    pub granularity: Option<String>,

    /// Timestamp field to bucket on
    #[arg(long, value_name = "FIELD")]
    pub time_field: Option<String>,

    /// Moving-average window for trend detection, in periods
    #[arg(short, long, value_name = "PERIODS")]
    pub window: Option<usize>,

    /// Only aggregate records from this source
    #[arg(short, long, value_name = "NAME")]
    pub source: Option<String>,

    /// Only aggregate records analyzed within the last N hours
    #[arg(long, value_name = "HOURS")]
    pub since_hours: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sentitrend.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of record files to load
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// File extensions to load (comma-separated)
    ///
    /// Example: --extensions json,jsonl
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when the trend is declining
    ///
    /// Useful for alerting from cron jobs or CI pipelines.
    #[arg(long)]
    pub fail_on_decline: bool,

    /// Dry run: list the record files that would be loaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .sentitrend.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Conventional file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input {
            Some(ref input) if !input.exists() => {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
            None => return Err("An input path is required".to_string()),
            _ => {}
        }

        if self.window == Some(0) {
            return Err("Window must be at least 1 period".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(ref source) = self.source {
            if source.trim().is_empty() {
                return Err("Source filter must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over both `--verbose` and `verbose = true` in the
    /// config file.
    pub fn log_level(&self, general: &GeneralConfig) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
