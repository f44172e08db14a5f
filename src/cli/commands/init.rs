//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "pulse.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Pulse configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Point store.path at your health database");
                println!("  2. List the kinds you granted read access in store.authorized_kinds");
                println!("  3. Validate configuration: pulse validate-config");
                println!("  4. List sources: pulse sources");
                println!("  5. Run export: pulse export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Pulse Configuration File
# Month-chunked health sample exporter

[application]
log_level = "info"
dry_run = false

[store]
backend = "sqlite"
path = "health.db"
authorized_kinds = ["heart_rate"]

[export]
kinds = ["heart_rate"]
mode = "full"
output_dir = "exports"
encoding = "utf16"
segment_by_source = true
batch_size = 1000
parallel_sources = 4

[state]
enabled = true

[verification]
enable_verification = false

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Pulse Configuration File
# Month-chunked health sample exporter
#
# This file contains all configuration options with examples and explanations.
# Every value can also be overridden with PULSE_<SECTION>_<KEY>, for example
# PULSE_EXPORT_OUTPUT_DIR=/tmp/exports.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (query and serialize, write no artifacts)
dry_run = false

# ============================================================================
# Sample Store
# ============================================================================
[store]
# Backend: "sqlite" (database file, opened read-only) or "memory"
# (optionally seeded from a JSON array of samples)
backend = "sqlite"

# Database file, ${VAR} references are expanded
path = "${HOME}/health/samples.db"

# Kinds the user granted read access to (heart_rate, step_count)
authorized_kinds = ["heart_rate", "step_count"]

# ============================================================================
# Export Configuration
# ============================================================================
[export]
# Kinds to export; each must also be authorized above
kinds = ["heart_rate"]

# Export mode: "full" or "incremental"
# - full: start every source at its earliest sample
# - incremental: resume every source at its last exported month
mode = "full"

# Output directory (default: <user data dir>/pulse/exports)
output_dir = "exports"

# Artifact encoding: "utf16" (little endian with BOM) or "utf8"
encoding = "utf16"

# One artifact per source and month (true) or per month (false)
segment_by_source = true

# Only export these source bundle ids (empty = all sources)
source_ids = []

# Samples fetched per store query (100-50000)
batch_size = 1000

# Sources exported concurrently (1-64)
parallel_sources = 4

# Rows between progress updates
progress_interval = 100

# Retries for a failed store query, with backoff in milliseconds
max_retries = 3
retry_backoff_ms = [1000, 2000, 4000]

# ============================================================================
# Watermarks
# ============================================================================
[state]
# Record the last exported month of every source
enabled = true

# Watermark file (default: .pulse-state.json in the output directory)
# path = "exports/.pulse-state.json"

# ============================================================================
# Artifact Verification
# ============================================================================
[verification]
# Re-read every artifact after the export and compare checksums
enable_verification = false

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable JSON file logging
local_enabled = false

# Log directory
local_path = "logs"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PulseConfig;
    use tempfile::TempDir;

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        let parsed: PulseConfig = toml::from_str(&config).unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# Pulse Configuration File"));
        assert!(config.contains("authorized_kinds"));
        assert!(config.contains("batch_size"));
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("pulse.toml");
        fs::write(&output, "existing").unwrap();

        let mut args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");

        args.force = true;
        assert_eq!(args.execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[store]"));
    }
}
