//! Watermark storage backends

use super::watermark::Watermark;
use crate::domain::{PulseError, Result, SampleKind};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Persistence for watermarks
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load a watermark; `Ok(None)` if the stream has none yet
    async fn load_watermark(&self, kind: SampleKind, stream: &str) -> Result<Option<Watermark>>;

    /// Create or replace a watermark
    async fn save_watermark(&self, watermark: &Watermark) -> Result<()>;

    /// Every stored watermark, ordered by id
    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>>;
}

/// Watermarks kept in one JSON file, keyed by watermark id
///
/// Saves rewrite the whole file through a temporary file and a rename.
pub struct FileStateStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Watermark>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                PulseError::State(format!("corrupt state file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PulseError::State(format!(
                "cannot read state file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_all(&self, watermarks: &BTreeMap<String, Watermark>) -> Result<()> {
        let state_error = |e: std::io::Error| {
            PulseError::State(format!(
                "cannot write state file {}: {}",
                self.path.display(),
                e
            ))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(state_error)?;
            }
        }

        let json = serde_json::to_string_pretty(watermarks)
            .map_err(|e| PulseError::State(format!("cannot encode watermarks: {e}")))?;
        let temp = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp, json).await.map_err(state_error)?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(state_error(e));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStorage for FileStateStorage {
    async fn load_watermark(&self, kind: SampleKind, stream: &str) -> Result<Option<Watermark>> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        Ok(all.remove(&Watermark::generate_id(kind, stream)))
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(watermark.id.clone(), watermark.clone());
        self.write_all(&all).await
    }

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_values().collect())
    }
}
