//! Tab-separated row layout

use super::format::{parse_timestamp, ABSENT};
use crate::domain::{PulseError, Result, SampleKind};
use chrono::{DateTime, Utc};

/// Number of columns of every row
pub const COLUMN_COUNT: usize = 7;

/// Header line for `kind`
pub fn header(kind: SampleKind) -> String {
    [
        "StartDate",
        "StartTime",
        "EndDate",
        "EndTime",
        kind.value_column(),
        "Device",
        "Metadata",
    ]
    .join("\t")
}

/// A data row read back from an artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub value: f64,
    pub device: Option<String>,
    pub metadata: Option<String>,
}

/// Parse one data row (without its line terminator)
///
/// # Errors
///
/// Returns [`PulseError::Serialization`] if the row does not have seven
/// columns or a column does not parse.
pub fn parse_row(line: &str) -> Result<ParsedRow> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != COLUMN_COUNT {
        return Err(PulseError::Serialization(format!(
            "expected {} columns, found {}",
            COLUMN_COUNT,
            columns.len()
        )));
    }

    let start_time = parse_timestamp(columns[0], columns[1]).map_err(PulseError::Serialization)?;
    let end_time = parse_timestamp(columns[2], columns[3]).map_err(PulseError::Serialization)?;
    let value = columns[4]
        .parse::<f64>()
        .map_err(|e| PulseError::Serialization(format!("invalid value '{}': {}", columns[4], e)))?;
    let optional = |text: &str| (text != ABSENT).then(|| text.to_string());

    Ok(ParsedRow {
        start_time,
        end_time,
        value,
        device: optional(columns[5]),
        metadata: optional(columns[6]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_heart_rate_header() {
        assert_eq!(
            header(SampleKind::HeartRate),
            "StartDate\tStartTime\tEndDate\tEndTime\tHeartRate(BPM)\tDevice\tMetadata"
        );
    }

    #[test]
    fn test_parse_row() {
        let row = parse_row("01/15/2020\t08:00:00\t01/15/2020\t08:00:05\t72.0\tnil\t{\"a\":1}")
            .unwrap();
        assert_eq!(row.start_time, Utc.with_ymd_and_hms(2020, 1, 15, 8, 0, 0).unwrap());
        assert_eq!(row.end_time, Utc.with_ymd_and_hms(2020, 1, 15, 8, 0, 5).unwrap());
        assert_eq!(row.value, 72.0);
        assert_eq!(row.device, None);
        assert_eq!(row.metadata.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_parse_row_wrong_column_count() {
        assert!(parse_row("01/15/2020\t08:00:00").is_err());
    }
}
