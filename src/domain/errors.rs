//! Domain error types
//!
//! This module defines the error hierarchy for Pulse. Library code returns
//! [`PulseError`]; the CLI layer wraps it in `anyhow` and maps it to exit codes.
//! Errors never expose third-party types (SQLite, I/O) directly.

use crate::domain::kind::SampleKind;
use thiserror::Error;

/// Main Pulse error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Read access has not been granted for a sample kind
    #[error("Authorization error: read access not granted for {0}")]
    Authorization(SampleKind),

    /// Sample store errors
    #[error("Store query error: {0}")]
    StoreQuery(#[from] StoreError),

    /// Failure writing an output artifact
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failure turning a sample into a row
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Watermark state errors
    #[error("State management error: {0}")]
    State(String),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PulseError {
    /// Whether this error ends the whole run rather than a single source stream
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, PulseError::Authorization(_) | PulseError::Configuration(_))
    }
}

/// Sample store errors
///
/// Errors reported by a [`SampleStore`](crate::adapters::store::SampleStore)
/// backend. Backends convert their native errors into these variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened or reached
    #[error("Sample store unavailable: {0}")]
    Unavailable(String),

    /// A query failed to execute
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored record could not be decoded into a sample
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

impl From<rusqlite::Error> for PulseError {
    fn from(err: rusqlite::Error) -> Self {
        PulseError::StoreQuery(err.into())
    }
}

impl From<std::io::Error> for PulseError {
    fn from(err: std::io::Error) -> Self {
        PulseError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PulseError {
    fn from(err: toml::de::Error) -> Self {
        PulseError::Configuration(format!("TOML parse error: {err}"))
    }
}
