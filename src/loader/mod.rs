//! Record loader for discovering and parsing scored-record files.
//!
//! This module walks an input path for `.json` / `.jsonl` files, respecting
//! configuration for extensions, excludes and file size limits, and
//! deserializes their contents into [`ScoredRecord`]s.

use crate::models::ScoredRecord;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Errors raised while loading record files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Input path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported record file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse {} line {line}: {source}", path.display())]
    JsonLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to parse {} record {index}: {source}", path.display())]
    JsonRecord {
        path: PathBuf,
        index: usize,
        source: serde_json::Error,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// On-disk layout of a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// A JSON array, or an object with a `records` array.
    Json,
    /// One JSON record per line.
    JsonLines,
}

impl RecordFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "json" => Some(RecordFormat::Json),
            "jsonl" | "ndjson" => Some(RecordFormat::JsonLines),
            _ => None,
        }
    }
}

const NOT_A_RECORD_DOCUMENT: &str = "expected an array of records or an object with a \"records\" array";

/// Configuration for record loading.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// File extensions to include (e.g., ["json", "jsonl"])
    pub extensions: Vec<String>,
    /// Names to skip while walking directories
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to load
    pub max_files: Option<usize>,
    /// Show a progress bar while loading directories
    pub show_progress: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string(), "jsonl".to_string()],
            excludes: vec!["node_modules".to_string(), "target".to_string()],
            max_file_size: 50 * 1024 * 1024, // 50MB
            max_files: None,
            show_progress: false,
        }
    }
}

impl From<&crate::config::LoaderConfig> for LoadConfig {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
            show_progress: false,
        }
    }
}

/// A record file found under the input path.
#[derive(Debug, Clone)]
pub struct RecordFile {
    /// Absolute or input-relative path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub format: RecordFormat,
}

/// Records read from an input path.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<ScoredRecord>,
    pub files_loaded: usize,
    pub files_failed: usize,
}

/// Loader for scored-record files.
pub struct RecordLoader {
    config: LoadConfig,
    root: PathBuf,
}

impl RecordLoader {
    /// Create a new loader rooted at a file or directory.
    pub fn new(root: PathBuf, config: LoadConfig) -> Self {
        Self { config, root }
    }

    /// List the record files that would be loaded.
    pub fn scan(&self) -> Result<Vec<RecordFile>, LoadError> {
        if !self.root.exists() {
            return Err(LoadError::NotFound(self.root.clone()));
        }

        if self.root.is_file() {
            let format = RecordFormat::from_path(&self.root)
                .ok_or_else(|| LoadError::UnsupportedFormat(self.root.clone()))?;
            let size = fs::metadata(&self.root)
                .map_err(|source| LoadError::Io {
                    path: self.root.clone(),
                    source,
                })?
                .len();
            return Ok(vec![RecordFile {
                path: self.root.clone(),
                size,
                format,
            }]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    debug!("Reached max_files limit of {}", max);
                    break;
                }
            }

            let entry = entry.map_err(|source| LoadError::Walk {
                path: self.root.clone(),
                source,
            })?;

            if let Some(file) = self.matches(&entry) {
                files.push(file);
            }
        }

        Ok(files)
    }

    /// Load every record under the input path.
    ///
    /// A single input file must parse; inside a directory, files that fail
    /// to load are skipped with a warning and counted in `files_failed`.
    pub fn load(&self) -> Result<LoadOutcome, LoadError> {
        let files = self.scan()?;

        if self.root.is_file() {
            let records = load_file(&files[0])?;
            return Ok(LoadOutcome {
                records,
                files_loaded: 1,
                files_failed: 0,
            });
        }

        let progress = self.progress_bar(files.len());
        let mut outcome = LoadOutcome::default();

        for file in &files {
            if let Some(ref pb) = progress {
                pb.set_message(file.path.display().to_string());
            }

            match load_file(file) {
                Ok(records) => {
                    debug!("Loaded {} records from {}", records.len(), file.path.display());
                    outcome.records.extend(records);
                    outcome.files_loaded += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    outcome.files_failed += 1;
                }
            }

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!(
            "Loaded {} records from {} files ({} failed)",
            outcome.records.len(),
            outcome.files_loaded,
            outcome.files_failed
        );

        Ok(outcome)
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.config.show_progress || len == 0 {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }

    /// Check if a walked entry is a loadable record file.
    fn matches(&self, entry: &DirEntry) -> Option<RecordFile> {
        if !entry.file_type().is_file() {
            return None;
        }

        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|allowed| allowed == ext) {
            return None;
        }

        let format = RecordFormat::from_path(path)?;

        let size = entry.metadata().ok()?.len();
        if size > self.config.max_file_size {
            debug!("Skipping {} ({} bytes over limit)", path.display(), size);
            return None;
        }

        Some(RecordFile {
            path: path.to_path_buf(),
            size,
            format,
        })
    }

    /// Check if an entry's name matches exclusion patterns.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();

        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

/// Read and parse one record file.
pub fn load_file(file: &RecordFile) -> Result<Vec<ScoredRecord>, LoadError> {
    let content = fs::read_to_string(&file.path).map_err(|source| LoadError::Io {
        path: file.path.clone(),
        source,
    })?;

    parse_records(&content, file.format, &file.path)
}

/// Parse record file content in the given format.
pub fn parse_records(
    content: &str,
    format: RecordFormat,
    path: &Path,
) -> Result<Vec<ScoredRecord>, LoadError> {
    match format {
        RecordFormat::Json => {
            let json_error = |source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            };

            let document: Value = serde_json::from_str(content).map_err(json_error)?;
            let items = match document {
                Value::Array(items) => items,
                Value::Object(mut map) => match map.remove("records") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(json_error(de::Error::custom(NOT_A_RECORD_DOCUMENT))),
                },
                _ => return Err(json_error(de::Error::custom(NOT_A_RECORD_DOCUMENT))),
            };

            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value(item).map_err(|source| LoadError::JsonRecord {
                        path: path.to_path_buf(),
                        index,
                        source,
                    })
                })
                .collect()
        }
        RecordFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| LoadError::JsonLine {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })
            })
            .collect(),
    }
}
