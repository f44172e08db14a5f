//! Status command implementation
//!
//! This module implements the `status` command for displaying the watermarks
//! left by previous exports.

use crate::config::load_config;
use crate::core::state::{ExportStatus, FileStateStorage, StateManager, Watermark};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Filter by sample kind (e.g. heart_rate)
    #[arg(long)]
    pub kind: Option<String>,

    /// Filter by source bundle id
    #[arg(long)]
    pub source_id: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let output_dir = match config.export.resolved_output_dir() {
            Ok(dir) => dir,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };
        let path = config.state.resolved_path(&output_dir);
        let state_manager =
            StateManager::new_with_storage(Arc::new(FileStateStorage::new(&path)), true);

        let watermarks = match state_manager.get_all_watermarks().await {
            Ok(w) => w,
            Err(e) => {
                println!("❌ Failed to load watermarks from {}", path.display());
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        if watermarks.is_empty() {
            println!("No export history found in {}.", path.display());
            println!("Run 'pulse export --mode incremental' to start tracking progress.");
            return Ok(0);
        }

        let filtered: Vec<&Watermark> = watermarks.iter().filter(|w| self.matches(w)).collect();
        if filtered.is_empty() {
            println!("No watermarks match the specified filters.");
            return Ok(0);
        }

        println!("Found {} watermark(s):", filtered.len());
        println!();
        println!(
            "{:<12} {:<36} {:<16} {:<10} {:<10} {:<20}",
            "Kind", "Source", "Status", "Rows", "Month", "Last Export"
        );
        println!("{}", "-".repeat(108));

        for watermark in filtered {
            let month = watermark
                .last_window_start
                .map(|start| start.format("%Y-%m").to_string())
                .unwrap_or_else(|| "-".to_string());
            let last_export = watermark
                .last_export_completed_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Never".to_string());

            println!(
                "{:<12} {:<36} {:<16} {:<10} {:<10} {:<20}",
                watermark.kind.as_str(),
                watermark.stream,
                status_label(&watermark.last_export_status),
                watermark.rows_exported,
                month,
                last_export
            );
        }

        println!();
        Ok(0)
    }

    fn matches(&self, watermark: &Watermark) -> bool {
        if let Some(kind) = &self.kind {
            if watermark.kind.as_str() != kind {
                return false;
            }
        }
        if let Some(source_id) = &self.source_id {
            if &watermark.stream != source_id {
                return false;
            }
        }
        true
    }
}

fn status_label(status: &ExportStatus) -> &'static str {
    match status {
        ExportStatus::Completed => "✅ Completed",
        ExportStatus::InProgress => "🔄 In Progress",
        ExportStatus::Failed => "❌ Failed",
        ExportStatus::Interrupted => "⚠️  Interrupted",
        ExportStatus::NotStarted => "⏸️  Not Started",
    }
}
