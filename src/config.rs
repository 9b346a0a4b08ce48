//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sentitrend.toml` files.

use crate::analysis::trend::DEFAULT_WINDOW;
use crate::models::{Granularity, DEFAULT_TIME_FIELD};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sentitrend.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "sentiment_report.md".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Bucket size: hourly, daily or weekly. Other names mean daily.
    #[serde(default = "default_granularity")]
    pub granularity: String,

    /// Timestamp field to bucket on.
    #[serde(default = "default_time_field")]
    pub time_field: String,

    /// Moving-average window for trend detection, in periods.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Only keep records from the last N hours.
    #[serde(default)]
    pub since_hours: Option<u64>,

    /// Only keep records from this source.
    #[serde(default)]
    pub source: Option<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            granularity: default_granularity(),
            time_field: default_time_field(),
            trend_window: default_trend_window(),
            since_hours: None,
            source: None,
        }
    }
}

impl AggregationConfig {
    /// Resolved granularity.
    pub fn granularity(&self) -> Granularity {
        Granularity::from_name(&self.granularity)
    }
}

fn default_granularity() -> String {
    Granularity::Daily.as_str().to_string()
}

fn default_time_field() -> String {
    DEFAULT_TIME_FIELD.to_string()
}

fn default_trend_window() -> usize {
    DEFAULT_WINDOW
}

/// Record loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum files to load.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    1000
}

fn default_extensions() -> Vec<String> {
    vec!["json", "jsonl", "ndjson"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_excludes() -> Vec<String> {
    vec!["target", "node_modules", "__pycache__", "venv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the per-period table.
    #[serde(default = "default_true")]
    pub include_periods: bool,

    /// Include the per-source table.
    #[serde(default = "default_true")]
    pub include_sources: bool,

    /// Maximum rows in the source table.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_periods: true,
            include_sources: true,
            max_sources: default_max_sources(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_sources() -> usize {
    20
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref granularity) = args.granularity {
            self.aggregation.granularity = granularity.clone();
        }
        if let Some(ref time_field) = args.time_field {
            self.aggregation.time_field = time_field.clone();
        }
        if let Some(window) = args.window {
            self.aggregation.trend_window = window;
        }
        if let Some(hours) = args.since_hours {
            self.aggregation.since_hours = Some(hours);
        }
        if let Some(ref source) = args.source {
            self.aggregation.source = Some(source.clone());
        }

        if let Some(max_files) = args.max_files {
            self.loader.max_files = max_files;
        }
        if let Some(ref extensions) = args.extensions {
            self.loader.extensions = extensions.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
