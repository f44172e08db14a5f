//! Column formatting
//!
//! Dates render as `MM/dd/yyyy` using the calendar year and times as 24-hour
//! `HH:mm:ss`, both in UTC.

use crate::domain::Metadata;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Placeholder for an absent optional column
pub const ABSENT: &str = "nil";

const DATE_FORMAT: &str = "%m/%d/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Render the date part of a timestamp
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Render the time part of a timestamp
pub fn format_time(at: DateTime<Utc>) -> String {
    at.format(TIME_FORMAT).to_string()
}

/// Parse a date and time column pair back into a UTC timestamp
pub fn parse_timestamp(date: &str, time: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| format!("invalid date '{date}': {e}"))?;
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|e| format!("invalid time '{time}': {e}"))?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Render a value in shortest round-trip form with at least one fractional digit
///
/// ```
/// use pulse::core::serialize::format::format_value;
///
/// assert_eq!(format_value(72.0), "72.0");
/// assert_eq!(format_value(0.1 + 0.2), "0.30000000000000004");
/// ```
pub fn format_value(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}

/// Render the device column; tabs and line breaks become spaces
pub fn format_device(device: Option<&str>) -> String {
    match device {
        Some(text) => text
            .chars()
            .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
            .collect(),
        None => ABSENT.to_string(),
    }
}

/// Render the metadata column as compact JSON with sorted keys
pub fn format_metadata(metadata: Option<&Metadata>) -> Result<String, String> {
    match metadata {
        Some(map) => serde_json::to_string(map).map_err(|e| format!("metadata: {e}")),
        None => Ok(ABSENT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(72.0, "72.0" ; "integral")]
    #[test_case(72.5, "72.5" ; "fractional")]
    #[test_case(0.1 + 0.2, "0.30000000000000004" ; "shortest round trip")]
    #[test_case(-3.0, "-3.0" ; "negative")]
    #[test_case(0.0, "0.0" ; "zero")]
    fn test_format_value(value: f64, expected: &str) {
        assert_eq!(format_value(value), expected);
        assert_eq!(format_value(value).parse::<f64>().unwrap(), value);
    }

    #[test]
    fn test_format_date_uses_calendar_year() {
        // Dec 30 2019 belongs to ISO week 1 of 2020
        let at = Utc.with_ymd_and_hms(2019, 12, 30, 23, 5, 9).unwrap();
        assert_eq!(format_date(at), "12/30/2019");
        assert_eq!(format_time(at), "23:05:09");
    }

    #[test]
    fn test_parse_timestamp() {
        let at = Utc.with_ymd_and_hms(2020, 2, 29, 7, 0, 1).unwrap();
        assert_eq!(parse_timestamp(&format_date(at), &format_time(at)).unwrap(), at);
        assert!(parse_timestamp("2020-02-29", "07:00:01").is_err());
    }

    #[test]
    fn test_format_device() {
        assert_eq!(format_device(None), "nil");
        assert_eq!(format_device(Some("Watch\tSeries\n4")), "Watch Series 4");
    }

    #[test]
    fn test_format_metadata_sorts_keys() {
        let metadata = Metadata::from([
            ("zeta".to_string(), json!(1)),
            ("alpha".to_string(), json!("a\tb")),
        ]);
        assert_eq!(
            format_metadata(Some(&metadata)).unwrap(),
            r#"{"alpha":"a\tb","zeta":1}"#
        );
        assert_eq!(format_metadata(None).unwrap(), "nil");
    }
}
