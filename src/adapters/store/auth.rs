//! Read authorization capability
//!
//! The authorization step of the host application hands Pulse a
//! [`ReadAuthorization`] listing the kinds the user allowed reading. Every
//! store access goes through an [`AuthorizedStore`], which refuses kinds that
//! are absent from the token.

use super::traits::{SamplePredicate, SampleQuery, SampleStore};
use crate::domain::{PulseError, Result, Sample, SampleKind, Source};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Capability token listing the sample kinds granted for reading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadAuthorization {
    kinds: BTreeSet<SampleKind>,
}

impl ReadAuthorization {
    /// Token granting read access to `kinds`
    pub fn grant(kinds: impl IntoIterator<Item = SampleKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Token granting nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether `kind` may be read
    pub fn allows(&self, kind: SampleKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Fail with [`PulseError::Authorization`] unless `kind` may be read
    pub fn require(&self, kind: SampleKind) -> Result<()> {
        if self.allows(kind) {
            Ok(())
        } else {
            Err(PulseError::Authorization(kind))
        }
    }

    /// Granted kinds, ordered
    pub fn kinds(&self) -> impl Iterator<Item = SampleKind> + '_ {
        self.kinds.iter().copied()
    }
}

/// Sample store guarded by a [`ReadAuthorization`]
#[derive(Clone)]
pub struct AuthorizedStore {
    inner: Arc<dyn SampleStore>,
    authorization: ReadAuthorization,
}

impl AuthorizedStore {
    /// Wrap `inner` with `authorization`
    pub fn new(inner: Arc<dyn SampleStore>, authorization: ReadAuthorization) -> Self {
        Self {
            inner,
            authorization,
        }
    }

    /// The capability token this store enforces
    pub fn authorization(&self) -> &ReadAuthorization {
        &self.authorization
    }
}

#[async_trait]
impl SampleStore for AuthorizedStore {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn sources_for_kind(&self, kind: SampleKind) -> Result<Vec<Source>> {
        self.authorization.require(kind)?;
        self.inner.sources_for_kind(kind).await
    }

    async fn query(&self, kind: SampleKind, query: &SampleQuery) -> Result<Vec<Sample>> {
        self.authorization.require(kind)?;
        self.inner.query(kind, query).await
    }

    async fn count(&self, kind: SampleKind, predicate: &SamplePredicate) -> Result<u64> {
        self.authorization.require(kind)?;
        self.inner.count(kind, predicate).await
    }
}
