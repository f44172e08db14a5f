//! Sample store abstraction traits
//!
//! This module defines the read-only query interface every sample store
//! backend implements, together with the predicate and query types the export
//! engine builds.

use crate::domain::ids::BundleId;
use crate::domain::{Result, Sample, SampleKind, Source};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new time range
    ///
    /// # Errors
    ///
    /// Returns an error if `end` is before `start`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> std::result::Result<Self, String> {
        if end < start {
            return Err(format!("time range end {end} is before start {start}"));
        }
        Ok(Self { start, end })
    }

    /// Whether `at` falls within `[start, end)`
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Whether the range contains no instant
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Single clause of a conjunctive predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Sample end time lies within the range
    EndTimeIn(TimeRange),
    /// Sample was contributed by the source with this bundle id
    FromSource(BundleId),
}

impl Clause {
    fn matches(&self, sample: &Sample) -> bool {
        match self {
            Clause::EndTimeIn(range) => range.contains(sample.end_time),
            Clause::FromSource(bundle_id) => &sample.source.bundle_id == bundle_id,
        }
    }
}

/// Conjunction of clauses; the empty predicate matches every sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplePredicate {
    clauses: Vec<Clause>,
}

impl SamplePredicate {
    /// Predicate matching every sample
    pub fn all() -> Self {
        Self::default()
    }

    /// Predicate matching samples whose end time lies within `range`
    pub fn for_time_range(range: TimeRange) -> Self {
        Self {
            clauses: vec![Clause::EndTimeIn(range)],
        }
    }

    /// Predicate matching samples from `source`
    pub fn for_source(source: &Source) -> Self {
        Self {
            clauses: vec![Clause::FromSource(source.bundle_id.clone())],
        }
    }

    /// Conjunction of `self` and `other`
    pub fn and(mut self, other: SamplePredicate) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// Clauses making up this predicate
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluate the predicate against a sample
    pub fn matches(&self, sample: &Sample) -> bool {
        self.clauses.iter().all(|clause| clause.matches(sample))
    }
}

/// Sort order of query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest end time first
    #[default]
    EndTimeAscending,
    /// Newest end time first
    EndTimeDescending,
}

/// Maximum number of samples a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryLimit {
    /// No limit
    #[default]
    Unbounded,
    /// At most this many samples
    At(usize),
}

/// Sample query: predicate, ordering, limit and offset
///
/// Samples with identical end times keep the store's own order, which is
/// stable across repeated queries, so `offset` paging never skips or repeats
/// a sample of an append-only store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleQuery {
    pub predicate: SamplePredicate,
    pub sort: SortOrder,
    pub limit: QueryLimit,
    pub offset: usize,
}

impl SampleQuery {
    /// Create a query with ascending order, no limit and no offset
    pub fn new(predicate: SamplePredicate) -> Self {
        Self {
            predicate,
            ..Self::default()
        }
    }

    /// Set the sort order
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set the limit
    pub fn limit(mut self, limit: QueryLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Set the offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Read-only sample store
///
/// This trait defines the interface that all store backends must implement.
/// Implementations must not modify the underlying collection.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Backend name, for logs
    fn backend_name(&self) -> &'static str;

    /// Distinct sources that contributed samples of `kind`
    ///
    /// Sources are returned ordered by name, then bundle id.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::StoreQuery`](crate::domain::PulseError::StoreQuery)
    /// if the store reports a failure.
    async fn sources_for_kind(&self, kind: SampleKind) -> Result<Vec<Source>>;

    /// Samples of `kind` matching the query
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::StoreQuery`](crate::domain::PulseError::StoreQuery)
    /// if the store reports a failure.
    async fn query(&self, kind: SampleKind, query: &SampleQuery) -> Result<Vec<Sample>>;

    /// Number of samples of `kind` matching the predicate
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::StoreQuery`](crate::domain::PulseError::StoreQuery)
    /// if the store reports a failure.
    async fn count(&self, kind: SampleKind, predicate: &SamplePredicate) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quantity, Unit};
    use chrono::TimeZone;
    use std::str::FromStr;

    fn sample(bundle: &str, end: DateTime<Utc>) -> Sample {
        Sample::builder()
            .kind(SampleKind::HeartRate)
            .quantity(Quantity::new(60.0, Unit::CountPerMinute))
            .start_time(end)
            .end_time(end)
            .source(Source::new("S", BundleId::from_str(bundle).unwrap()))
            .build()
            .unwrap()
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_time_range_is_half_open() {
        let range = TimeRange::new(jan(1), jan(2)).unwrap();
        assert!(range.contains(jan(1)));
        assert!(!range.contains(jan(2)));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        assert!(TimeRange::new(jan(2), jan(1)).is_err());
        assert!(TimeRange::new(jan(1), jan(1)).unwrap().is_empty());
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        assert!(SamplePredicate::all().matches(&sample("a.b", jan(5))));
    }

    #[test]
    fn test_predicate_conjunction() {
        let source = Source::new("S", BundleId::from_str("a.b").unwrap());
        let predicate = SamplePredicate::for_time_range(TimeRange::new(jan(1), jan(10)).unwrap())
            .and(SamplePredicate::for_source(&source));

        assert_eq!(predicate.clauses().len(), 2);
        assert!(predicate.matches(&sample("a.b", jan(5))));
        assert!(!predicate.matches(&sample("c.d", jan(5))));
        assert!(!predicate.matches(&sample("a.b", jan(10))));
    }

    #[test]
    fn test_sample_query_builder() {
        let query = SampleQuery::new(SamplePredicate::all())
            .sort(SortOrder::EndTimeDescending)
            .limit(QueryLimit::At(1))
            .offset(5);
        assert_eq!(query.sort, SortOrder::EndTimeDescending);
        assert_eq!(query.limit, QueryLimit::At(1));
        assert_eq!(query.offset, 5);
    }
}
