//! Core business logic for Pulse.
//!
//! # Modules
//!
//! - [`export`] - Month windows, source discovery, the chunked export driver and coordination
//! - [`serialize`] - Sample to tab-separated row
//! - [`progress`] - Status log and progress reporting
//! - [`state`] - Watermarks for incremental exports
//! - [`verification`] - Post-export artifact verification
//!
//! # Export Workflow
//!
//! 1. **Authorize**: Every configured kind must be readable
//! 2. **Discover**: List the sources of each kind
//! 3. **Bootstrap**: Find each source's earliest sample (or resume from its watermark)
//! 4. **Export**: Query, serialize and persist one calendar month at a time
//! 5. **Checkpoint**: Update the source's watermark after each window
//! 6. **Verify** (optional): Re-read every artifact and compare checksums
//! 7. **Report**: Generate export summary and status log
//!
//! # Example
//!
//! ```rust,no_run
//! use pulse::config::load_config;
//! use pulse::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pulse.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = ExportCoordinator::new(config, shutdown_rx)?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Artifacts: {}", summary.artifacts.len());
//! println!("Rows: {}", summary.rows_exported);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod progress;
pub mod serialize;
pub mod state;
pub mod verification;
