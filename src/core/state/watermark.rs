//! Watermark model for tracking export state
//!
//! A watermark records how far the export of one stream got, where a stream is
//! a `{kind, source}` pair (or `{kind, all}` for an unsegmented export).
//! Incremental runs resume each stream at the last window it completed.

use crate::domain::SampleKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream name used for an export that is not segmented by source
pub const ALL_SOURCES: &str = "all";

/// Export status enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Export is in progress
    InProgress,
    /// Export reached the present
    Completed,
    /// Export stopped on an error
    Failed,
    /// Export was cancelled before reaching the present
    Interrupted,
    /// Export was never started
    #[default]
    NotStarted,
}

/// Watermark for tracking export state per `{kind, stream}`
///
/// # Examples
///
/// ```
/// use pulse::core::state::watermark::{ExportStatus, WatermarkBuilder};
/// use pulse::domain::SampleKind;
///
/// let watermark = WatermarkBuilder::new(SampleKind::HeartRate, "com.example.watch")
///     .rows_exported(100)
///     .build();
///
/// assert_eq!(watermark.id, "heart_rate_com.example.watch");
/// assert_eq!(watermark.rows_exported, 100);
/// assert_eq!(watermark.last_export_status, ExportStatus::NotStarted);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    /// Unique identifier, `"{kind}_{stream}"`
    pub id: String,

    /// Sample kind this watermark tracks
    pub kind: SampleKind,

    /// Source bundle id, or [`ALL_SOURCES`]
    pub stream: String,

    /// Start of the last window that was fully persisted
    pub last_window_start: Option<DateTime<Utc>>,

    /// Rows written by all runs
    pub rows_exported: u64,

    /// Artifacts written by all runs
    pub artifacts_written: u64,

    /// When the last run of this stream started
    pub last_export_started_at: Option<DateTime<Utc>>,

    /// When the last run of this stream ended
    pub last_export_completed_at: Option<DateTime<Utc>>,

    /// Status of the last run
    pub last_export_status: ExportStatus,
}

impl Watermark {
    /// Generate the identifier for a watermark
    pub fn generate_id(kind: SampleKind, stream: &str) -> String {
        format!("{}_{}", kind.as_str(), stream)
    }

    /// Check if the last export completed successfully
    pub fn is_completed(&self) -> bool {
        self.last_export_status == ExportStatus::Completed
    }

    /// Check if the last export failed
    pub fn is_failed(&self) -> bool {
        self.last_export_status == ExportStatus::Failed
    }

    /// Mark the export as started
    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.last_export_started_at = Some(at);
        self.last_export_completed_at = None;
        self.last_export_status = ExportStatus::InProgress;
    }

    /// Mark the export as completed
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.finish(at, ExportStatus::Completed);
    }

    /// Mark the export as failed
    pub fn mark_failed(&mut self, at: DateTime<Utc>) {
        self.finish(at, ExportStatus::Failed);
    }

    /// Mark the export as interrupted
    pub fn mark_interrupted(&mut self, at: DateTime<Utc>) {
        self.finish(at, ExportStatus::Interrupted);
    }

    fn finish(&mut self, at: DateTime<Utc>, status: ExportStatus) {
        self.last_export_completed_at = Some(at);
        self.last_export_status = status;
    }

    /// Record a fully persisted window
    pub fn record_window(&mut self, start: DateTime<Utc>, rows: u64) {
        self.last_window_start = Some(start);
        self.rows_exported += rows;
        if rows > 0 {
            self.artifacts_written += 1;
        }
    }
}

/// Builder for creating Watermark instances
pub struct WatermarkBuilder {
    kind: SampleKind,
    stream: String,
    last_window_start: Option<DateTime<Utc>>,
    rows_exported: u64,
    artifacts_written: u64,
    last_export_status: ExportStatus,
}

impl WatermarkBuilder {
    /// Create a new WatermarkBuilder
    pub fn new(kind: SampleKind, stream: impl Into<String>) -> Self {
        Self {
            kind,
            stream: stream.into(),
            last_window_start: None,
            rows_exported: 0,
            artifacts_written: 0,
            last_export_status: ExportStatus::NotStarted,
        }
    }

    /// Set the start of the last completed window
    pub fn last_window_start(mut self, start: DateTime<Utc>) -> Self {
        self.last_window_start = Some(start);
        self
    }

    /// Set the rows exported count
    pub fn rows_exported(mut self, rows: u64) -> Self {
        self.rows_exported = rows;
        self
    }

    /// Set the artifacts written count
    pub fn artifacts_written(mut self, artifacts: u64) -> Self {
        self.artifacts_written = artifacts;
        self
    }

    /// Set the export status
    pub fn last_export_status(mut self, status: ExportStatus) -> Self {
        self.last_export_status = status;
        self
    }

    /// Build the Watermark
    pub fn build(self) -> Watermark {
        Watermark {
            id: Watermark::generate_id(self.kind, &self.stream),
            kind: self.kind,
            stream: self.stream,
            last_window_start: self.last_window_start,
            rows_exported: self.rows_exported,
            artifacts_written: self.artifacts_written,
            last_export_started_at: None,
            last_export_completed_at: None,
            last_export_status: self.last_export_status,
        }
    }
}
