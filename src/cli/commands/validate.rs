//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Pulse configuration file.

use crate::config::{load_config, PulseConfig, StoreBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as well
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_config_summary(&config);
        Ok(0)
    }
}

fn print_config_summary(config: &PulseConfig) {
    let kinds = |kinds: &[crate::domain::SampleKind]| {
        kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    match config.store.backend {
        StoreBackend::Sqlite => println!("  Store: SQLite"),
        StoreBackend::Memory => println!("  Store: in-memory"),
    }
    if let Some(path) = &config.store.path {
        println!("  Store Path: {}", path.display());
    }
    println!("  Authorized Kinds: {}", kinds(&config.store.authorized_kinds));
    println!("  Export Kinds: {}", kinds(&config.export.kinds));
    println!("  Export Mode: {:?}", config.export.mode);
    match config.export.resolved_output_dir() {
        Ok(dir) => println!("  Output Directory: {}", dir.display()),
        Err(e) => println!("  Output Directory: ⚠️  {e}"),
    }
    println!("  Encoding: {:?}", config.export.encoding);
    println!(
        "  Segment By Source: {}",
        if config.export.segment_by_source { "yes" } else { "no" }
    );
    if !config.export.source_ids.is_empty() {
        println!("  Source IDs: {:?}", config.export.source_ids);
    }
    println!("  Batch Size: {}", config.export.batch_size);
    println!("  Parallel Sources: {}", config.export.parallel_sources);
    println!("  Watermarks: {}", config.state.enabled);
    println!("  Verification: {}", config.verification.enable_verification);
    println!("  Dry Run: {}", config.is_dry_run());
    println!();
}
