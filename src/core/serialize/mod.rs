//! Record serialization
//!
//! Turns a [`Sample`] into one tab-separated row:
//!
//! ```text
//! StartDate  StartTime  EndDate  EndTime  HeartRate(BPM)  Device  Metadata
//! ```
//!
//! The value column holds the sample converted to its kind's export unit.
//! Absent device or metadata render as `nil`.

pub mod format;
pub mod row;

use crate::domain::{PulseError, Result, Sample, SampleKind};
use format::{format_date, format_device, format_metadata, format_time, format_value};

pub use row::{header, parse_row, ParsedRow};

/// Serializer for the samples of one kind
#[derive(Debug, Clone, Copy)]
pub struct RecordSerializer {
    kind: SampleKind,
}

impl RecordSerializer {
    pub fn new(kind: SampleKind) -> Self {
        Self { kind }
    }

    /// Header line
    pub fn header(&self) -> String {
        header(self.kind)
    }

    /// Serialize one sample into a row, without line terminator
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Serialization`] if the sample is of another kind,
    /// its unit cannot be converted to the export unit, or its metadata cannot
    /// be rendered.
    pub fn serialize(&self, sample: &Sample) -> Result<String> {
        if sample.kind != self.kind {
            return Err(PulseError::Serialization(format!(
                "expected a {} sample, got {}",
                self.kind, sample.kind
            )));
        }

        let unit = self.kind.export_unit();
        let value = sample.quantity.value_in(unit).ok_or_else(|| {
            PulseError::Serialization(format!(
                "cannot convert {} to {}",
                sample.quantity.unit, unit
            ))
        })?;
        let metadata =
            format_metadata(sample.metadata.as_ref()).map_err(PulseError::Serialization)?;

        Ok([
            format_date(sample.start_time),
            format_time(sample.start_time),
            format_date(sample.end_time),
            format_time(sample.end_time),
            format_value(value),
            format_device(sample.device.as_deref()),
            metadata,
        ]
        .join("\t"))
    }
}
