//! In-memory sample store
//!
//! Holds samples in insertion order. Used by tests, dry runs and embedders that
//! already have samples in hand; can be seeded from a JSON array of samples.

use super::traits::{QueryLimit, SamplePredicate, SampleQuery, SampleStore, SortOrder};
use crate::domain::{PulseError, Result, Sample, SampleKind, Source, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};

/// Sample store backed by a vector
#[derive(Debug, Default)]
pub struct InMemorySampleStore {
    samples: RwLock<Vec<Sample>>,
}

impl InMemorySampleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `samples`
    pub fn with_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: RwLock::new(samples.into_iter().collect()),
        }
    }

    /// Load a store from a JSON file containing an array of samples
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file cannot be read and
    /// [`StoreError::CorruptRecord`] if it does not hold valid samples.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let samples: Vec<Sample> =
            serde_json::from_str(&content).map_err(|e| StoreError::CorruptRecord {
                id: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), count = samples.len(), "Loaded samples");
        Ok(Self::with_samples(samples))
    }

    /// Append a sample
    pub fn insert(&self, sample: Sample) -> Result<()> {
        self.samples
            .write()
            .map_err(|_| PulseError::from(StoreError::Unavailable("store lock poisoned".into())))?
            .push(sample);
        Ok(())
    }

    /// Number of samples held, all kinds
    pub fn len(&self) -> usize {
        self.samples.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the store holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Sample>>> {
        self.samples
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()).into())
    }
}

#[async_trait]
impl SampleStore for InMemorySampleStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn sources_for_kind(&self, kind: SampleKind) -> Result<Vec<Source>> {
        let samples = self.read()?;
        // One source per bundle id; the most recently inserted name wins
        let mut by_bundle: HashMap<&str, &Source> = HashMap::new();
        for sample in samples.iter().filter(|s| s.kind == kind) {
            by_bundle.insert(sample.source.bundle_id.as_str(), &sample.source);
        }
        let mut sources: Vec<Source> = by_bundle.into_values().cloned().collect();
        sources.sort();
        Ok(sources)
    }

    async fn query(&self, kind: SampleKind, query: &SampleQuery) -> Result<Vec<Sample>> {
        let samples = self.read()?;
        let mut matching: Vec<&Sample> = samples
            .iter()
            .filter(|s| s.kind == kind && query.predicate.matches(s))
            .collect();

        // sort_by is stable, so ties keep insertion order
        match query.sort {
            SortOrder::EndTimeAscending => matching.sort_by(|a, b| a.end_time.cmp(&b.end_time)),
            SortOrder::EndTimeDescending => matching.sort_by(|a, b| b.end_time.cmp(&a.end_time)),
        }

        let take = match query.limit {
            QueryLimit::Unbounded => usize::MAX,
            QueryLimit::At(n) => n,
        };

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self, kind: SampleKind, predicate: &SamplePredicate) -> Result<u64> {
        let samples = self.read()?;
        Ok(samples
            .iter()
            .filter(|s| s.kind == kind && predicate.matches(s))
            .count() as u64)
    }
}
