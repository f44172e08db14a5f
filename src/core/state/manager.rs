//! State manager for watermark persistence

use super::storage::StateStorage;
use super::watermark::{Watermark, WatermarkBuilder};
use crate::domain::{Result, SampleKind};
use std::sync::Arc;

/// State manager for watermark persistence
///
/// Loads and saves watermarks through a [`StateStorage`] backend. In dry-run
/// mode loads still happen but saves are skipped.
pub struct StateManager {
    storage: Arc<dyn StateStorage>,
    dry_run: bool,
}

impl StateManager {
    /// Create a new StateManager with a state storage backend
    pub fn new_with_storage(storage: Arc<dyn StateStorage>, dry_run: bool) -> Self {
        Self { storage, dry_run }
    }

    /// Load the watermark of a stream, or a fresh one if none is stored
    pub async fn load_or_new(&self, kind: SampleKind, stream: &str) -> Result<Watermark> {
        Ok(self
            .storage
            .load_watermark(kind, stream)
            .await?
            .unwrap_or_else(|| WatermarkBuilder::new(kind, stream).build()))
    }

    /// Load a watermark
    pub async fn load_watermark(&self, kind: SampleKind, stream: &str) -> Result<Option<Watermark>> {
        self.storage.load_watermark(kind, stream).await
    }

    /// Save a watermark
    pub async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        if self.dry_run {
            tracing::debug!(id = %watermark.id, "Dry run: skipping watermark save");
            return Ok(());
        }
        self.storage.save_watermark(watermark).await
    }

    /// Get all watermarks
    pub async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        self.storage.get_all_watermarks().await
    }

    /// Save progress after a persisted window
    pub async fn checkpoint_window(&self, watermark: &Watermark) -> Result<()> {
        tracing::debug!(
            id = %watermark.id,
            last_window_start = ?watermark.last_window_start,
            rows_exported = watermark.rows_exported,
            "Checkpointing window"
        );
        self.save_watermark(watermark).await
    }
}
