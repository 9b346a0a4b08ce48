//! Sentitrend - sentiment aggregation and trend reports
//!
//! A CLI tool that loads scored sentiment records from JSON files,
//! aggregates them by period and source, and writes a trend report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad input, config, unreadable file, etc.)
//!   2 - Trend is declining and --fail-on-decline is set

use anyhow::{Context, Result};
use chrono::Utc;
use sentitrend::analysis::RecordFilter;
use sentitrend::cli::{Args, OutputFormat};
use sentitrend::config::{Config, CONFIG_FILE_NAME};
use sentitrend::loader::{LoadConfig, RecordLoader};
use sentitrend::models::{Direction, ReportMetadata};
use sentitrend::report;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file can raise the log level, so it is read before logging starts
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(&config.general));

    info!("Sentitrend v{}", env!("CARGO_PKG_VERSION"));
    origin.log();
    debug!("Arguments: {:?}", args);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sentitrend.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize granularity, trend window, loader limits, and more.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level from the flags and config.
fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LevelFilter::from_level(level).to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete load-aggregate-report workflow. Returns exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let input = args
        .input
        .clone()
        .context("An input path is required")?;

    let mut loader_config = LoadConfig::from(&config.loader);
    loader_config.show_progress = !args.quiet;
    let loader = RecordLoader::new(input.clone(), loader_config);

    if args.dry_run {
        return handle_dry_run(&loader);
    }

    // Step 1: Load records
    println!("📥 Loading records from: {}", input.display());
    let outcome = loader
        .load()
        .with_context(|| format!("Failed to load records from {}", input.display()))?;

    // Step 2: Narrow the record set
    let aggregation = &config.aggregation;
    let mut filter = match aggregation.since_hours {
        Some(hours) => RecordFilter::recent_hours(hours, Utc::now()),
        None => RecordFilter::default(),
    };
    if let Some(ref source) = aggregation.source {
        filter = filter.with_source(source.clone());
    }

    let loaded = outcome.records.len();
    let records = filter.apply(outcome.records);
    if records.len() < loaded {
        info!("Filter kept {} of {} records", records.len(), loaded);
    }
    if records.is_empty() {
        warn!("No records to aggregate");
    }

    // Step 3: Aggregate
    let granularity = aggregation.granularity();
    println!("\n🔬 Aggregating {} records...", records.len());
    println!("   Granularity: {}", granularity);
    println!("   Time field: {}", aggregation.time_field);
    println!("   Trend window: {} periods", aggregation.trend_window);

    let metadata = ReportMetadata {
        input: input.display().to_string(),
        generated_at: Utc::now(),
        files_loaded: outcome.files_loaded,
        files_failed: outcome.files_failed,
        total_records: records.len(),
        granularity,
        time_field: aggregation.time_field.clone(),
        trend_window: aggregation.trend_window,
        source_filter: filter.source.clone(),
        since: filter.since,
    };

    let dashboard = report::build_report(&records, metadata);

    // Step 4: Render and save the report
    println!("\n📝 Generating report...");

    let output_path = output_path(&args, &config);
    report::write_report(&dashboard, args.format, &config.report, &output_path)?;

    // Print summary
    let sentiment = &dashboard.sentiment;
    println!("\n📊 Aggregation Summary:");
    println!("   Periods: {}", dashboard.periods.len());
    println!("   Sources: {}", dashboard.sources.len());
    println!(
        "   - 🟢 Positive: {} | 🔴 Negative: {} | ⚪ Neutral: {}",
        sentiment.positive_count, sentiment.negative_count, sentiment.neutral_count
    );
    println!(
        "   Overall: {} (avg score {:.3})",
        sentiment.overall_sentiment, sentiment.average_score
    );
    println!(
        "   Trend: {} {} ({:+.2}%)",
        dashboard.trend.direction.emoji(),
        dashboard.trend.direction,
        dashboard.trend.change_rate
    );
    println!("\n✅ Report saved to: {}", output_path.display());

    if args.fail_on_decline && dashboard.trend.direction == Direction::Declining {
        eprintln!("\n⛔ Sentiment trend is declining. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Resolve the report path; JSON output swaps the default extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_none() && args.format == OutputFormat::Json {
        path.with_extension(args.format.extension())
    } else {
        path
    }
}

/// Handle --dry-run: list record files, exit.
fn handle_dry_run(loader: &RecordLoader) -> Result<i32> {
    println!("\n🔍 Dry run: scanning record files (nothing is aggregated)...\n");

    let files = loader.scan()?;

    if files.is_empty() {
        println!("   No record files found.");
    } else {
        println!("   Found {} files that would be loaded:\n", files.len());
        for file in &files {
            println!("     📄 {} ({} bytes)", file.path.display(), file.size);
        }
        println!("\n   Total: {} files", files.len());
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Where the configuration came from, logged once logging is up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Invalid(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Invalid(reason) => warn!("Failed to load config: {}", reason),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Invalid(format!("{:#}", e)))),
    }
}
