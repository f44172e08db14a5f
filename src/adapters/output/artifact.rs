//! Output artifact persistence
//!
//! An [`ArtifactWriter`] streams encoded rows into a hidden temporary file next
//! to the final artifact and renames it into place on [`ArtifactWriter::commit`].
//! A writer that is dropped or aborted removes its temporary file, so a
//! cancelled window never leaves a partial artifact behind. Committing replaces
//! any earlier artifact of the same name.

use super::encoding::{byte_order_mark, encode};
use crate::config::OutputEncoding;
use crate::domain::{PulseError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

/// A committed output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedArtifact {
    /// Final path of the artifact
    pub path: PathBuf,

    /// Data rows written, header excluded
    pub rows: usize,

    /// Size in bytes, byte order mark included
    pub bytes: u64,

    /// Hex-encoded SHA-256 of the file contents
    pub checksum: String,
}

/// Streaming writer for one artifact
pub struct ArtifactWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    file: Option<BufWriter<File>>,
    encoding: OutputEncoding,
    hasher: Sha256,
    rows: usize,
    bytes: u64,
}

impl ArtifactWriter {
    /// Create a writer for `dir/file_name`, creating `dir` if needed
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Persistence`] if the directory or temporary file
    /// cannot be created.
    pub async fn create(dir: &Path, file_name: &str, encoding: OutputEncoding) -> Result<Self> {
        fs::create_dir_all(dir).await.map_err(|e| {
            PulseError::Persistence(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let final_path = dir.join(file_name);
        let temp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        let file = File::create(&temp_path).await.map_err(|e| {
            PulseError::Persistence(format!("cannot create {}: {}", temp_path.display(), e))
        })?;

        let mut writer = Self {
            final_path,
            temp_path,
            file: Some(BufWriter::new(file)),
            encoding,
            hasher: Sha256::new(),
            rows: 0,
            bytes: 0,
        };
        writer.write_bytes(byte_order_mark(encoding)).await?;
        Ok(writer)
    }

    /// Final path the artifact is committed to
    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write the header line; not counted as a row
    pub async fn write_header(&mut self, line: &str) -> Result<()> {
        self.write_line(line).await
    }

    /// Write one data row
    pub async fn write_row(&mut self, line: &str) -> Result<()> {
        self.write_line(line).await?;
        self.rows += 1;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut bytes = encode(line, self.encoding);
        bytes.extend(encode("\n", self.encoding));
        self.write_bytes(&bytes).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| PulseError::Persistence("artifact already closed".to_string()))?;
        file.write_all(bytes).await.map_err(|e| {
            PulseError::Persistence(format!("write to {} failed: {}", self.temp_path.display(), e))
        })?;
        self.hasher.update(bytes);
        self.bytes += bytes.len() as u64;
        Ok(())
    }

    /// Flush the temporary file and rename it over the final path
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Persistence`] if flushing or renaming fails; the
    /// temporary file is removed in that case.
    pub async fn commit(mut self) -> Result<CommittedArtifact> {
        let result = self.finish().await;
        if result.is_err() {
            self.remove_temp().await;
        }
        result
    }

    async fn finish(&mut self) -> Result<CommittedArtifact> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| PulseError::Persistence("artifact already closed".to_string()))?;

        let persist = |e: std::io::Error| {
            PulseError::Persistence(format!(
                "cannot persist {}: {}",
                self.final_path.display(),
                e
            ))
        };

        file.flush().await.map_err(persist)?;
        file.get_ref().sync_all().await.map_err(persist)?;
        drop(file);
        fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(persist)?;

        let checksum = format!("{:x}", std::mem::take(&mut self.hasher).finalize());
        tracing::debug!(
            path = %self.final_path.display(),
            rows = self.rows,
            bytes = self.bytes,
            "Committed artifact"
        );

        Ok(CommittedArtifact {
            path: self.final_path.clone(),
            rows: self.rows,
            bytes: self.bytes,
            checksum,
        })
    }

    /// Discard the artifact, removing its temporary file
    pub async fn abort(mut self) {
        self.remove_temp().await;
    }

    async fn remove_temp(&mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp_path.display(), error = %e, "Failed to remove temporary artifact");
            }
        }
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        // Still open means neither committed nor aborted
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::output::encoding::decode;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_commit_writes_encoded_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::create(dir.path(), "a.tsv", OutputEncoding::Utf16)
            .await
            .unwrap();
        writer.write_header("H1\tH2").await.unwrap();
        writer.write_row("1\t2").await.unwrap();
        let artifact = writer.commit().await.unwrap();

        assert_eq!(artifact.rows, 1);
        assert_eq!(artifact.path, dir.path().join("a.tsv"));
        assert_eq!(entries(dir.path()), vec!["a.tsv"]);

        let bytes = std::fs::read(&artifact.path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        assert_eq!(bytes.len() as u64, artifact.bytes);
        assert_eq!(decode(&bytes, OutputEncoding::Utf16).unwrap(), "H1\tH2\n1\t2\n");
        assert_eq!(artifact.checksum.len(), 64);
    }

    #[tokio::test]
    async fn test_commit_overwrites_existing_artifact() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tsv"), b"stale").unwrap();

        let mut writer = ArtifactWriter::create(dir.path(), "a.tsv", OutputEncoding::Utf8)
            .await
            .unwrap();
        writer.write_header("H").await.unwrap();
        writer.commit().await.unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("a.tsv")).unwrap(), "H\n");
    }

    #[tokio::test]
    async fn test_abort_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::create(dir.path(), "a.tsv", OutputEncoding::Utf8)
            .await
            .unwrap();
        writer.write_row("x").await.unwrap();
        writer.abort().await;

        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_drop_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        {
            let mut writer = ArtifactWriter::create(dir.path(), "a.tsv", OutputEncoding::Utf8)
                .await
                .unwrap();
            writer.write_row("x").await.unwrap();
        }
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_create_makes_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("pulse");
        let writer = ArtifactWriter::create(&nested, "a.tsv", OutputEncoding::Utf8)
            .await
            .unwrap();
        assert_eq!(writer.path(), nested.join("a.tsv"));
        writer.abort().await;
        assert!(nested.exists());
    }
}
