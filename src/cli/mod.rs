//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Pulse using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Pulse - month-chunked health sample exporter
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(version, about, long_about = None)]
#[command(author = "Pulse Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pulse.toml", env = "PULSE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PULSE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export samples to per-source, per-month TSV files
    Export(commands::export::ExportArgs),

    /// List the sources that recorded samples
    Sources(commands::sources::SourcesArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show watermarks of previous exports
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
