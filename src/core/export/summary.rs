//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use crate::core::progress::StatusLog;
use crate::core::verification::report::VerificationReport;
use crate::domain::{PulseError, SampleKind, Source, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// An artifact written during the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedArtifact {
    pub kind: SampleKind,

    /// Stream key: source bundle id, or `all`
    pub stream: String,

    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub path: PathBuf,

    /// Data rows, header excluded
    pub rows: usize,

    pub bytes: u64,

    /// Hex-encoded SHA-256 of the file
    pub checksum: String,
}

/// How a source stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// Every window up to the present was processed
    Completed,
    /// The source has no samples of the kind
    NoSamples,
    /// Cancelled by a shutdown signal
    Interrupted,
    /// Stopped early by a store failure
    Aborted,
}

/// Outcome of exporting one source stream
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub kind: SampleKind,
    pub stream: String,
    pub source: Option<Source>,
    pub status: StreamStatus,
    pub windows_processed: usize,
    pub rows_exported: u64,
    pub artifacts: Vec<ExportedArtifact>,
    pub errors: Vec<ExportError>,
}

impl StreamReport {
    pub fn new(kind: SampleKind, stream: impl Into<String>, source: Option<Source>) -> Self {
        Self {
            kind,
            stream: stream.into(),
            source,
            status: StreamStatus::Completed,
            windows_processed: 0,
            rows_exported: 0,
            artifacts: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Summary of an export operation
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Kinds the run covered
    pub kinds: Vec<SampleKind>,

    /// Sources discovered across all kinds
    pub sources_discovered: usize,

    pub streams_completed: usize,
    pub streams_without_samples: usize,
    pub streams_interrupted: usize,
    pub streams_aborted: usize,

    /// Windows queried, including empty ones
    pub windows_processed: usize,

    /// Rows written to artifacts (or serialized, in a dry run)
    pub rows_exported: u64,

    pub artifacts: Vec<ExportedArtifact>,

    /// Duration of the export
    pub duration: Duration,

    /// Errors encountered during export
    pub errors: Vec<ExportError>,

    /// Status lines in the order they were reported
    pub status_log: StatusLog,

    /// Whether a shutdown signal cut the run short
    pub interrupted: bool,

    pub dry_run: bool,

    /// Verification report (if verification was run)
    pub verification_report: Option<VerificationReport>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Fold the outcome of one stream into the summary
    pub fn record_stream(&mut self, report: StreamReport) {
        match report.status {
            StreamStatus::Completed => self.streams_completed += 1,
            StreamStatus::NoSamples => self.streams_without_samples += 1,
            StreamStatus::Interrupted => {
                self.streams_interrupted += 1;
                self.interrupted = true;
            }
            StreamStatus::Aborted => self.streams_aborted += 1,
        }
        self.windows_processed += report.windows_processed;
        self.rows_exported += report.rows_exported;
        self.artifacts.extend(report.artifacts);
        self.errors.extend(report.errors);
    }

    /// Set the verification report
    pub fn set_verification_report(&mut self, report: VerificationReport) {
        self.verification_report = Some(report);
    }

    /// No errors, no interruption and no failed verification
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
            && !self.interrupted
            && self
                .verification_report
                .as_ref()
                .map_or(true, VerificationReport::is_success)
    }

    pub fn has_error_type(&self, error_type: ExportErrorType) -> bool {
        self.errors.iter().any(|e| e.error_type == error_type)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            kinds = ?self.kinds,
            sources = self.sources_discovered,
            streams_completed = self.streams_completed,
            streams_without_samples = self.streams_without_samples,
            streams_interrupted = self.streams_interrupted,
            streams_aborted = self.streams_aborted,
            windows = self.windows_processed,
            rows = self.rows_exported,
            artifacts = self.artifacts.len(),
            duration_secs = self.duration.as_secs(),
            dry_run = self.dry_run,
            "Export completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Export error"
                );
            }
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportErrorType {
    /// Read access to a kind was not granted
    Authorization,
    /// The store could not be opened
    StoreUnavailable,
    /// A store query failed after retries
    Query,
    /// An artifact could not be written
    Persistence,
    /// A sample could not be turned into a row
    Serialization,
    /// Watermark state could not be read or written
    State,
    /// Configuration error
    Configuration,
    /// Unknown error
    Unknown,
}

impl ExportErrorType {
    /// Classify a library error
    pub fn of(error: &PulseError) -> Self {
        match error {
            PulseError::Authorization(_) => Self::Authorization,
            PulseError::StoreQuery(StoreError::Unavailable(_)) => Self::StoreUnavailable,
            PulseError::StoreQuery(_) => Self::Query,
            PulseError::Persistence(_) | PulseError::Io(_) => Self::Persistence,
            PulseError::Serialization(_) => Self::Serialization,
            PulseError::State(_) => Self::State,
            PulseError::Configuration(_) | PulseError::Validation(_) => Self::Configuration,
            PulseError::Export(_) | PulseError::Other(_) => Self::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone, Serialize)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., source, window)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Classify and wrap a library error
    pub fn from_error(error: &PulseError) -> Self {
        Self::new(ExportErrorType::of(error), error.to_string())
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BundleId;
    use chrono::TimeZone;

    fn artifact(rows: usize) -> ExportedArtifact {
        ExportedArtifact {
            kind: SampleKind::HeartRate,
            stream: "com.example.watch".to_string(),
            window_start: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap(),
            path: PathBuf::from("Watch-com.example.watch-heartrate-2020-01.tsv"),
            rows,
            bytes: 128,
            checksum: "00".repeat(32),
        }
    }

    #[test]
    fn test_export_summary_creation() {
        let summary = ExportSummary::new();

        assert_eq!(summary.rows_exported, 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.errors.is_empty());
        assert!(summary.artifacts.is_empty());
        assert!(summary.is_successful());
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = ExportSummary::new().with_duration(Duration::from_secs(120));
        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_record_stream() {
        let source = Source::new("Watch", BundleId::new("com.example.watch").unwrap());
        let mut report = StreamReport::new(SampleKind::HeartRate, "com.example.watch", Some(source));
        report.windows_processed = 3;
        report.rows_exported = 7;
        report.artifacts.push(artifact(7));

        let mut summary = ExportSummary::new();
        summary.record_stream(report);

        assert_eq!(summary.streams_completed, 1);
        assert_eq!(summary.windows_processed, 3);
        assert_eq!(summary.rows_exported, 7);
        assert_eq!(summary.artifacts.len(), 1);
        assert!(summary.is_successful());
    }

    #[test]
    fn test_interrupted_stream_is_not_successful() {
        let mut report = StreamReport::new(SampleKind::HeartRate, "all", None);
        report.status = StreamStatus::Interrupted;

        let mut summary = ExportSummary::new();
        summary.record_stream(report);

        assert!(summary.interrupted);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_export_error_with_context() {
        let error = ExportError::new(ExportErrorType::Query, "Query failed".to_string())
            .with_context("source=com.example.watch".to_string());

        assert_eq!(error.error_type, ExportErrorType::Query);
        assert_eq!(error.context, Some("source=com.example.watch".to_string()));
    }

    #[test]
    fn test_error_classification() {
        let unavailable = PulseError::from(StoreError::Unavailable("gone".into()));
        let timeout = PulseError::from(StoreError::Timeout("slow".into()));

        assert_eq!(
            ExportErrorType::of(&PulseError::Authorization(SampleKind::HeartRate)),
            ExportErrorType::Authorization
        );
        assert_eq!(ExportErrorType::of(&unavailable), ExportErrorType::StoreUnavailable);
        assert_eq!(ExportErrorType::of(&timeout), ExportErrorType::Query);
        assert_eq!(
            ExportErrorType::of(&PulseError::Persistence("disk full".into())),
            ExportErrorType::Persistence
        );
    }

    #[test]
    fn test_has_error_type() {
        let mut summary = ExportSummary::new();
        summary.add_error(ExportError::from_error(&PulseError::Persistence(
            "disk full".into(),
        )));

        assert!(summary.has_error_type(ExportErrorType::Persistence));
        assert!(!summary.has_error_type(ExportErrorType::Query));
        assert!(!summary.is_successful());
    }
}
