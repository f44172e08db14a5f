//! Calendar-month export windows
//!
//! A window is the half-open range `[start, end)` of one source's samples that
//! ends up in one artifact. `end` is always the first instant of a month (UTC);
//! only the first window of a source may start mid-month.

use crate::adapters::store::{QueryLimit, SamplePredicate, SampleQuery, SampleStore, TimeRange};
use crate::core::serialize::format::format_date;
use crate::domain::{PulseError, Result, Sample, SampleKind, Source};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// First instant of the calendar month following `at`, in UTC
///
/// Returns `None` only past chrono's representable range.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use pulse::core::export::window::first_instant_of_next_month;
///
/// let at = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap();
/// let next = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(first_instant_of_next_month(at), Some(next));
/// ```
pub fn first_instant_of_next_month(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if at.month() == 12 {
        (at.year().checked_add(1)?, 1)
    } else {
        (at.year(), at.month() + 1)
    };
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// One month of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportWindow {
    /// Source filter; `None` for an unsegmented export
    pub source: Option<Source>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ExportWindow {
    /// Window starting at `start` and ending at the next month boundary
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Export`] if the month boundary is not representable.
    pub fn starting_at(source: Option<Source>, start: DateTime<Utc>) -> Result<Self> {
        let end = next_boundary(start)?;
        Ok(Self { source, start, end })
    }

    /// The following month
    pub fn next(&self) -> Result<Self> {
        Ok(Self {
            source: self.source.clone(),
            start: self.end,
            end: next_boundary(self.end)?,
        })
    }

    /// Whether the window lies entirely before `now`
    ///
    /// The export loop advances past a window only in that case.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Store predicate selecting the window's samples
    pub fn predicate(&self) -> SamplePredicate {
        let by_time = SamplePredicate::for_time_range(self.time_range());
        match &self.source {
            Some(source) => by_time.and(SamplePredicate::for_source(source)),
            None => by_time,
        }
    }

    /// Whether a sample belongs to this window
    pub fn contains(&self, sample: &Sample) -> bool {
        self.predicate().matches(sample)
    }

    /// `yyyy-MM` of the window start
    pub fn month_label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// Artifact file name for `kind`
    pub fn file_name(&self, kind: SampleKind) -> String {
        match &self.source {
            Some(source) => format!(
                "{}-{}-{}.tsv",
                source.file_prefix(),
                kind.file_label(),
                self.month_label()
            ),
            None => format!("{}-{}.tsv", kind.file_label(), self.month_label()),
        }
    }

    /// `MM/dd/yyyy - MM/dd/yyyy`, as shown in status lines
    pub fn describe(&self) -> String {
        format!("{} - {}", format_date(self.start), format_date(self.end))
    }
}

fn next_boundary(at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    first_instant_of_next_month(at)
        .ok_or_else(|| PulseError::Export(format!("no month boundary after {at}")))
}

/// Oldest sample of `kind` (optionally from `source`) by end time
pub async fn find_earliest_sample(
    store: &dyn SampleStore,
    kind: SampleKind,
    source: Option<&Source>,
) -> Result<Option<Sample>> {
    let predicate = source
        .map(SamplePredicate::for_source)
        .unwrap_or_default();
    let query = SampleQuery::new(predicate).limit(QueryLimit::At(1));
    Ok(store.query(kind, &query).await?.into_iter().next())
}

/// First window of a stream: from the earliest sample's start to the next
/// month boundary
pub fn bootstrap_window(source: Option<Source>, earliest: &Sample) -> Result<ExportWindow> {
    ExportWindow::starting_at(source, earliest.start_time)
}
