//! Configuration schema types
//!
//! This module defines the configuration structure for Pulse.

use crate::domain::{BundleId, SampleKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sample store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite database file, opened read-only
    #[default]
    Sqlite,
    /// In-memory store, optionally seeded from a JSON file of samples
    Memory,
}

/// Export mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Bootstrap every source from its earliest sample
    #[default]
    Full,
    /// Resume every source from its last completed month
    Incremental,
}

/// Text encoding of output artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// UTF-16 little endian with byte order mark
    #[default]
    Utf16,
    /// UTF-8 without byte order mark
    Utf8,
}

/// Main Pulse configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Sample store settings
    pub store: StoreConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Watermark state settings
    #[serde(default)]
    pub state: StateConfig,

    /// Artifact verification settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PulseConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate()?;
        self.export.validate()?;
        self.state.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Dry run if either the application or export section asks for it
    pub fn is_dry_run(&self) -> bool {
        self.application.dry_run || self.export.dry_run
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (query and serialize, write nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend (sqlite or memory)
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file (sqlite) or JSON sample file (memory)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Kinds the user granted read access to
    #[serde(default = "default_kinds")]
    pub authorized_kinds: Vec<SampleKind>,
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::Sqlite && self.path.is_none() {
            return Err("store.path is required when store.backend = 'sqlite'".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            authorized_kinds: default_kinds(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Sample kinds to export
    #[serde(default = "default_kinds")]
    pub kinds: Vec<SampleKind>,

    /// Export mode (full or incremental)
    #[serde(default)]
    pub mode: ExportMode,

    /// Output directory (default: per-user data directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Artifact encoding (utf16 or utf8)
    #[serde(default)]
    pub encoding: OutputEncoding,

    /// One artifact per source and month (true) or per month (false)
    #[serde(default = "default_true")]
    pub segment_by_source: bool,

    /// Restrict the export to these source bundle ids (empty = all)
    #[serde(default)]
    pub source_ids: Vec<String>,

    /// Samples fetched per store query
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of sources exported concurrently
    #[serde(default = "default_parallel_sources")]
    pub parallel_sources: usize,

    /// Rows between progress updates
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Maximum retry attempts for a failed store query
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Retry backoff intervals in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: Vec<u64>,

    /// Dry run mode - query and serialize without writing artifacts
    #[serde(default)]
    pub dry_run: bool,
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.kinds.is_empty() {
            return Err("export.kinds cannot be empty".to_string());
        }

        if !(100..=50_000).contains(&self.batch_size) {
            return Err(format!(
                "export.batch_size must be between 100 and 50000, got {}",
                self.batch_size
            ));
        }

        if self.parallel_sources == 0 || self.parallel_sources > 64 {
            return Err(format!(
                "export.parallel_sources must be between 1 and 64, got {}",
                self.parallel_sources
            ));
        }

        if self.progress_interval == 0 {
            return Err("export.progress_interval must be > 0".to_string());
        }

        if self.max_retries > 10 {
            return Err(format!(
                "export.max_retries must be <= 10, got {}",
                self.max_retries
            ));
        }

        for id in &self.source_ids {
            BundleId::new(id.as_str())
                .map_err(|e| format!("Invalid export.source_ids entry: {e}"))?;
        }

        if !self.segment_by_source && !self.source_ids.is_empty() {
            return Err(
                "export.source_ids requires export.segment_by_source = true".to_string(),
            );
        }

        Ok(())
    }

    /// Output directory, falling back to `<data dir>/pulse/exports`
    ///
    /// # Errors
    ///
    /// Returns an error if no output directory is configured and the platform
    /// has no per-user data directory.
    pub fn resolved_output_dir(&self) -> Result<PathBuf, String> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("pulse").join("exports"))
            .ok_or_else(|| {
                "export.output_dir is not set and no user data directory exists".to_string()
            })
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            kinds: default_kinds(),
            mode: ExportMode::default(),
            output_dir: None,
            encoding: OutputEncoding::default(),
            segment_by_source: true,
            source_ids: Vec::new(),
            batch_size: default_batch_size(),
            parallel_sources: default_parallel_sources(),
            progress_interval: default_progress_interval(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            dry_run: false,
        }
    }
}

/// Watermark state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Persist watermarks after each window
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Watermark file (default: `.pulse-state.json` in the output directory)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StateConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err("state.path cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Watermark file path for the given output directory
    pub fn resolved_path(&self, output_dir: &std::path::Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| output_dir.join(".pulse-state.json"))
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Artifact verification configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerificationConfig {
    /// Re-read every artifact after the export and compare checksums
    #[serde(default)]
    pub enable_verification: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation (daily, hourly or never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".into());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_kinds() -> Vec<SampleKind> {
    vec![SampleKind::HeartRate]
}

fn default_batch_size() -> usize {
    1000
}

fn default_parallel_sources() -> usize {
    4
}

fn default_progress_interval() -> usize {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_backoff_ms() -> Vec<u64> {
    vec![1000, 2000, 4000]
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
