//! Export command implementation
//!
//! This module implements the `export` command, which writes every configured
//! sample kind to per-source, per-month TSV artifacts.

use super::{exit_code_for_error, exit_code_for_summary};
use crate::config::{load_config, ExportMode, OutputEncoding, PulseConfig, StoreBackend};
use crate::core::export::{ExportCoordinator, ExportErrorType, ExportSummary};
use crate::core::progress::StatusSink;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Override the sample store path
    #[arg(long)]
    pub store: Option<String>,

    /// Override the output directory
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Only export these source bundle ids (comma-separated)
    #[arg(long)]
    pub source_id: Option<String>,

    /// Override export mode (full or incremental)
    #[arg(long)]
    pub mode: Option<String>,

    /// Override artifact encoding (utf16 or utf8)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Write one artifact per month covering all sources
    #[arg(long)]
    pub unsegmented: bool,

    /// Dry run mode - query and serialize without writing artifacts
    #[arg(long)]
    pub dry_run: bool,
}

/// Prints status lines as they are reported
struct ConsoleStatusSink;

impl StatusSink for ConsoleStatusSink {
    fn report(&self, line: &str) {
        println!("  {line}");
    }
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if let Err(message) = self.apply_overrides(&mut config) {
            tracing::error!(error = %message, "Invalid command line override");
            eprintln!("{message}");
            return Ok(2);
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.is_dry_run() {
            tracing::info!("Dry run mode enabled - no artifacts will be written");
            println!("🔍 DRY RUN MODE - No artifacts will be written");
            println!();
        }

        tracing::info!("Creating export coordinator");
        let coordinator = match ExportCoordinator::new(config, shutdown_signal) {
            Ok(c) => c.with_sinks(Some(Arc::new(ConsoleStatusSink)), None),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(exit_code_for_error(&e));
            }
        };

        println!("🚀 Starting export to {}", coordinator.output_dir().display());
        println!();

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(exit_code_for_error(&e));
            }
        };

        print_summary(&summary);

        let exit_code = exit_code_for_summary(&summary);
        match exit_code {
            0 => println!("✅ Export completed successfully!"),
            130 => {
                println!("⚠️  Export interrupted. Completed months were kept.");
                println!("   Run again with --mode incremental to resume.");
                tracing::info!("Export interrupted by user signal");
            }
            4 => println!("❌ Sample store unavailable"),
            _ => println!("⚠️  Export completed with failures"),
        }

        Ok(exit_code)
    }

    /// Apply command line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut PulseConfig) -> Result<(), String> {
        if let Some(store) = &self.store {
            tracing::info!(store = %store, "Overriding store path from CLI");
            config.store.path = Some(PathBuf::from(store));
            if store.ends_with(".json") {
                config.store.backend = StoreBackend::Memory;
            }
        }

        if let Some(dir) = &self.output_dir {
            tracing::info!(output_dir = %dir, "Overriding output directory from CLI");
            config.export.output_dir = Some(PathBuf::from(dir));
        }

        if let Some(ids) = &self.source_id {
            let ids: Vec<String> = ids
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!(source_ids = ?ids, "Overriding source ids from CLI");
            config.export.source_ids = ids;
        }

        if let Some(mode) = &self.mode {
            config.export.mode = match mode.to_lowercase().as_str() {
                "full" => ExportMode::Full,
                "incremental" => ExportMode::Incremental,
                _ => return Err(format!("Invalid mode: {mode}. Use 'full' or 'incremental'")),
            };
            tracing::info!(mode = ?config.export.mode, "Overriding export mode from CLI");
        }

        if let Some(encoding) = &self.encoding {
            config.export.encoding = match encoding.to_lowercase().as_str() {
                "utf16" | "utf-16" => OutputEncoding::Utf16,
                "utf8" | "utf-8" => OutputEncoding::Utf8,
                _ => return Err(format!("Invalid encoding: {encoding}. Use 'utf16' or 'utf8'")),
            };
            tracing::info!(encoding = ?config.export.encoding, "Overriding encoding from CLI");
        }

        if self.unsegmented {
            tracing::info!("Disabling per-source segmentation from CLI");
            config.export.segment_by_source = false;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        Ok(())
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!(
        "  Kinds: {}",
        summary
            .kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Sources: {}", summary.sources_discovered);
    println!("  Months queried: {}", summary.windows_processed);
    println!("  Rows exported: {}", summary.rows_exported);
    println!("  Artifacts: {}", summary.artifacts.len());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.artifacts.is_empty() {
        println!("📁 Artifacts:");
        for artifact in &summary.artifacts {
            println!("  {} ({} rows)", artifact.path.display(), artifact.rows);
        }
        println!();
    }

    if let Some(report) = &summary.verification_report {
        println!("{}", report.format_summary());
    }

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        if summary.has_error_type(ExportErrorType::Serialization) {
            println!("    Samples that could not be serialized were skipped.");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ApplicationConfig, ExportConfig, LoggingConfig, StateConfig, StoreConfig,
        VerificationConfig,
    };

    fn config() -> PulseConfig {
        PulseConfig {
            application: ApplicationConfig::default(),
            store: StoreConfig {
                path: Some(PathBuf::from("health.db")),
                ..StoreConfig::default()
            },
            export: ExportConfig::default(),
            state: StateConfig::default(),
            verification: VerificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs::default();
        let mut config = config();
        args.apply_overrides(&mut config).unwrap();

        assert_eq!(config.export.mode, ExportMode::Full);
        assert!(config.export.segment_by_source);
        assert!(!config.is_dry_run());
    }

    #[test]
    fn test_export_args_with_overrides() {
        let args = ExportArgs {
            store: Some("samples.json".to_string()),
            output_dir: Some("out".to_string()),
            source_id: Some("com.example.watch, com.example.phone".to_string()),
            mode: Some("incremental".to_string()),
            encoding: Some("utf8".to_string()),
            unsegmented: false,
            dry_run: true,
        };
        let mut config = config();
        args.apply_overrides(&mut config).unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.path, Some(PathBuf::from("samples.json")));
        assert_eq!(config.export.output_dir, Some(PathBuf::from("out")));
        assert_eq!(
            config.export.source_ids,
            vec!["com.example.watch", "com.example.phone"]
        );
        assert_eq!(config.export.mode, ExportMode::Incremental);
        assert_eq!(config.export.encoding, OutputEncoding::Utf8);
        assert!(config.is_dry_run());
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let args = ExportArgs {
            mode: Some("partial".to_string()),
            ..ExportArgs::default()
        };
        let err = args.apply_overrides(&mut config()).unwrap_err();
        assert!(err.contains("partial"));
    }

    #[test]
    fn test_unsegmented_override() {
        let args = ExportArgs {
            unsegmented: true,
            ..ExportArgs::default()
        };
        let mut config = config();
        args.apply_overrides(&mut config).unwrap();
        assert!(!config.export.segment_by_source);
    }

    #[tokio::test]
    async fn test_missing_config_exits_with_configuration_code() {
        let (_tx, rx) = watch::channel(false);
        let code = ExportArgs::default()
            .execute("/nonexistent/pulse.toml", rx)
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
