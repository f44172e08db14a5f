//! Sample kinds, units and quantities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of physiological measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Heart rate, exported in count/min
    HeartRate,
    /// Step count, exported in count
    StepCount,
}

impl SampleKind {
    /// All kinds Pulse knows how to export
    pub const ALL: [SampleKind; 2] = [SampleKind::HeartRate, SampleKind::StepCount];

    /// Stable identifier used in configuration and in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::HeartRate => "heart_rate",
            SampleKind::StepCount => "step_count",
        }
    }

    /// Label used in artifact filenames
    pub fn file_label(&self) -> &'static str {
        match self {
            SampleKind::HeartRate => "heartrate",
            SampleKind::StepCount => "stepcount",
        }
    }

    /// Header of the value column, e.g. `HeartRate(BPM)`
    pub fn value_column(&self) -> &'static str {
        match self {
            SampleKind::HeartRate => "HeartRate(BPM)",
            SampleKind::StepCount => "StepCount(count)",
        }
    }

    /// Unit values are converted to before serialization
    pub fn export_unit(&self) -> Unit {
        match self {
            SampleKind::HeartRate => Unit::CountPerMinute,
            SampleKind::StepCount => Unit::Count,
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::HeartRate => write!(f, "heart rate"),
            SampleKind::StepCount => write!(f, "step count"),
        }
    }
}

impl FromStr for SampleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heart_rate" | "heartrate" | "heart-rate" => Ok(SampleKind::HeartRate),
            "step_count" | "stepcount" | "step-count" => Ok(SampleKind::StepCount),
            _ => Err(format!(
                "Unknown sample kind '{s}'. Expected one of: heart_rate, step_count"
            )),
        }
    }
}

/// Unit a quantity is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Dimensionless count
    #[serde(rename = "count")]
    Count,
    /// Count per second
    #[serde(rename = "count/s")]
    CountPerSecond,
    /// Count per minute (beats per minute for heart rate)
    #[serde(rename = "count/min")]
    CountPerMinute,
}

impl Unit {
    /// Unit symbol as stored
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::CountPerSecond => "count/s",
            Unit::CountPerMinute => "count/min",
        }
    }

    /// Seconds per time unit for rate units
    fn rate_seconds(&self) -> Option<f64> {
        match self {
            Unit::Count => None,
            Unit::CountPerSecond => Some(1.0),
            Unit::CountPerMinute => Some(60.0),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "count" => Ok(Unit::Count),
            "count/s" => Ok(Unit::CountPerSecond),
            "count/min" => Ok(Unit::CountPerMinute),
            other => Err(format!("Unknown unit '{other}'")),
        }
    }
}

/// Numeric value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Value expressed in `unit`, or `None` when the units are incompatible
    ///
    /// Converting to the quantity's own unit returns the stored value untouched.
    pub fn value_in(&self, unit: Unit) -> Option<f64> {
        if self.unit == unit {
            return Some(self.value);
        }
        match (self.unit.rate_seconds(), unit.rate_seconds()) {
            (Some(from), Some(to)) => Some(self.value / from * to),
            _ => None,
        }
    }

    /// Whether this quantity can be expressed in `unit`
    pub fn is_compatible_with(&self, unit: Unit) -> bool {
        self.value_in(unit).is_some()
    }
}
