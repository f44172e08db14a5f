//! Sample domain model
//!
//! This module defines the immutable [`Sample`] record read from a sample store.

use super::kind::{Quantity, SampleKind};
use super::source::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form sample metadata; keys are kept sorted so rendering is deterministic
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One timestamped health measurement
///
/// Samples are read-only; the export engine never mutates or deletes them.
///
/// # Examples
///
/// ```
/// use pulse::domain::{BundleId, Quantity, SampleBuilder, SampleKind, Source, Unit};
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2020, 1, 15, 8, 0, 0).unwrap();
/// let sample = SampleBuilder::new()
///     .kind(SampleKind::HeartRate)
///     .quantity(Quantity::new(72.0, Unit::CountPerMinute))
///     .start_time(at)
///     .end_time(at)
///     .source(Source::new("Watch", BundleId::new("com.example.watch").unwrap()))
///     .build()
///     .unwrap();
/// assert!(sample.device.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Kind of measurement
    pub kind: SampleKind,

    /// Measured value and its unit
    pub quantity: Quantity,

    /// Start of the measurement interval
    pub start_time: DateTime<Utc>,

    /// End of the measurement interval
    pub end_time: DateTime<Utc>,

    /// Device or app that recorded the sample
    pub source: Source,

    /// Optional device description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Optional key-value metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Sample {
    /// Creates a new builder for constructing a Sample
    pub fn builder() -> SampleBuilder {
        SampleBuilder::default()
    }
}

/// Builder for constructing Sample instances
#[derive(Debug, Default)]
pub struct SampleBuilder {
    kind: Option<SampleKind>,
    quantity: Option<Quantity>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    source: Option<Source>,
    device: Option<String>,
    metadata: Option<Metadata>,
}

impl SampleBuilder {
    /// Creates a new SampleBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample kind
    pub fn kind(mut self, kind: SampleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the quantity
    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the start time
    pub fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Sets the end time
    pub fn end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the source
    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the device description
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Sets the metadata
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the Sample
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing, if the end time is
    /// before the start time, or if the quantity cannot be expressed in the
    /// kind's export unit.
    pub fn build(self) -> Result<Sample, String> {
        let kind = self.kind.ok_or("kind is required")?;
        let quantity = self.quantity.ok_or("quantity is required")?;
        let start_time = self.start_time.ok_or("start_time is required")?;
        let end_time = self.end_time.ok_or("end_time is required")?;
        let source = self.source.ok_or("source is required")?;

        if end_time < start_time {
            return Err(format!(
                "end_time {end_time} is before start_time {start_time}"
            ));
        }

        if !quantity.is_compatible_with(kind.export_unit()) {
            return Err(format!(
                "unit {} is not compatible with {} (expected {})",
                quantity.unit,
                kind,
                kind.export_unit()
            ));
        }

        Ok(Sample {
            kind,
            quantity,
            start_time,
            end_time,
            source,
            device: self.device,
            metadata: self.metadata,
        })
    }
}
