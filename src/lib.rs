// Pulse - Incremental month-chunked health sample exporter
// Copyright (c) 2025 Pulse Contributors
// Licensed under the MIT License

//! # Pulse - month-chunked health sample export
//!
//! Pulse exports time-series health samples (heart rate by default) from a local
//! sample store into tab-separated files, one per source and calendar month.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Discovering** the sources that recorded samples of a kind
//! - **Bootstrapping** each source from its earliest sample
//! - **Exporting** one calendar month at a time until the present
//! - **Tracking** per-source watermarks for incremental runs
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export, serialize, progress, state, verification)
//! - [`adapters`] - Sample store and artifact output
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulse::config::load_config;
//! use pulse::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pulse.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = ExportCoordinator::new(config, shutdown_rx)?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     for artifact in &summary.artifacts {
//!         println!("{}", artifact.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Artifacts
//!
//! Each artifact is named `{source}-{bundle}-{kind}-{yyyy-MM}.tsv` and holds a
//! header row followed by one row per sample, ordered by end time:
//!
//! ```text
//! StartDate   StartTime  EndDate     EndTime   HeartRate(BPM)  Device  Metadata
//! 01/15/2020  10:00:00   01/15/2020  10:01:00  72.0            nil     nil
//! ```
//!
//! A sample belongs to the month its end time falls in. Months without samples
//! produce no artifact.
//!
//! ## Error Handling
//!
//! Pulse uses the [`domain::PulseError`] type for all library errors:
//!
//! ```rust,no_run
//! use pulse::domain::PulseError;
//!
//! fn example() -> Result<(), PulseError> {
//!     let config = pulse::config::load_config("pulse.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
