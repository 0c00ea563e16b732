//! File-backed analysis cache.
//!
//! One JSON document per photo, named after the hex-encoded photo id so any
//! id is a safe file name. Ids too long for a hex name are keyed by their
//! SHA3-256 digest instead. Writes go to a uniquely named temporary file and
//! are renamed into place, so readers never observe a partial record.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha3::{Digest, Sha3_256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{current_version, AnalysisCache};
use crate::error::{Result, SmartFillError};
use crate::model::PhotoAnalysis;

const RECORD_EXTENSION: &str = "json";

/// Longest hex stem used as a file name. Leaves room for the extension
/// under the common 255-byte file name limit.
const MAX_HEX_STEM: usize = 200;

#[derive(Debug, Clone)]
pub struct FileAnalysisCache {
    dir: PathBuf,
}

impl FileAnalysisCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            SmartFillError::CacheIo(format!("Failed to create {}: {e}", dir.display()))
        })?;
        info!(dir = %dir.display(), "Opened analysis cache");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, photo_id: &str) -> PathBuf {
        let stem = hex::encode(photo_id.as_bytes());
        if stem.len() <= MAX_HEX_STEM {
            return self.dir.join(format!("{stem}.{RECORD_EXTENSION}"));
        }
        let mut hasher = Sha3_256::new();
        hasher.update(photo_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.dir.join(format!("sha3-{digest}.{RECORD_EXTENSION}"))
    }
}

fn write_record(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| {
        SmartFillError::CacheIo(format!("Failed to stage record in {}: {e}", dir.display()))
    })?;
    staged.write_all(bytes).map_err(|e| {
        SmartFillError::CacheIo(format!("Failed to write {}: {e}", staged.path().display()))
    })?;
    staged.persist(path).map_err(|e| {
        SmartFillError::CacheIo(format!("Failed to move {} into place: {e}", path.display()))
    })?;
    Ok(())
}

#[async_trait]
impl AnalysisCache for FileAnalysisCache {
    async fn get(&self, photo_id: &str) -> Result<Option<PhotoAnalysis>> {
        let path = self.record_path(photo_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SmartFillError::CacheIo(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        match serde_json::from_slice::<PhotoAnalysis>(&bytes) {
            Ok(analysis) if analysis.id == photo_id => Ok(current_version(Some(analysis))),
            Ok(analysis) => {
                warn!(photo_id, stored = %analysis.id, "Cache record belongs to another photo");
                Ok(None)
            }
            Err(e) => {
                // A corrupt record is re-analyzed rather than failing the lookup.
                warn!(photo_id, error = %e, "Discarding unreadable cache record");
                Ok(None)
            }
        }
    }

    async fn put(&self, analysis: &PhotoAnalysis) -> Result<()> {
        let path = self.record_path(&analysis.id);
        let bytes = serde_json::to_vec_pretty(analysis)?;
        let len = bytes.len();

        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_record(&dir, &path, &bytes))
            .await
            .map_err(|e| SmartFillError::CacheIo(format!("Cache write task failed: {e}")))??;

        debug!(photo_id = %analysis.id, bytes = len, "Cached analysis");
        Ok(())
    }

    async fn remove(&self, photo_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.record_path(photo_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SmartFillError::CacheIo(format!(
                "Failed to remove record for {photo_id}: {e}"
            ))),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            SmartFillError::CacheIo(format!("Failed to list {}: {e}", self.dir.display()))
        })?;

        let mut removed = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SmartFillError::CacheIo(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            tokio::fs::remove_file(&path).await.map_err(|e| {
                SmartFillError::CacheIo(format!("Failed to remove {}: {e}", path.display()))
            })?;
            removed += 1;
        }

        info!(removed, "Cleared analysis cache");
        Ok(())
    }
}
