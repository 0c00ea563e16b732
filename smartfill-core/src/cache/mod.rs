//! Persistent photo analysis cache.
//!
//! Records are keyed by photo id. `put` overwrites unconditionally; `get`
//! returns `None` for absent records and for records stamped with another
//! [`ANALYSIS_VERSION`]. Callers decide whether a present record is deep
//! enough for their request via [`PhotoAnalysis::satisfies`].

mod file;
mod memory;

pub use file::FileAnalysisCache;
pub use memory::MemoryAnalysisCache;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::SmartFillConfig;
use crate::error::{Result, ANALYSIS_VERSION};
use crate::model::PhotoAnalysis;

/// Keyed store of photo analyses. Implementations must be thread-safe.
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    async fn get(&self, photo_id: &str) -> Result<Option<PhotoAnalysis>>;

    async fn put(&self, analysis: &PhotoAnalysis) -> Result<()>;

    async fn remove(&self, photo_id: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Look up many ids concurrently.
    ///
    /// A failed lookup only loses that id; it is logged and reported absent.
    async fn get_many(&self, photo_ids: &[String]) -> HashMap<String, PhotoAnalysis> {
        let lookups = photo_ids.iter().map(|id| async move { (id, self.get(id).await) });

        let mut found = HashMap::with_capacity(photo_ids.len());
        for (id, result) in join_all(lookups).await {
            match result {
                Ok(Some(analysis)) => {
                    found.insert(id.clone(), analysis);
                }
                Ok(None) => {}
                Err(e) => warn!(photo_id = %id, error = %e, "Cache lookup failed"),
            }
        }
        found
    }
}

/// Drop records written under a different schema version.
pub(crate) fn current_version(record: Option<PhotoAnalysis>) -> Option<PhotoAnalysis> {
    match record {
        Some(analysis) if analysis.version != ANALYSIS_VERSION => {
            debug!(
                photo_id = %analysis.id,
                version = analysis.version,
                "Ignoring analysis from another schema version"
            );
            None
        }
        other => other,
    }
}

/// Open the cache described by the configuration: file-backed when a cache
/// directory is set, in-memory otherwise.
pub async fn open_cache(config: &SmartFillConfig) -> Result<Arc<dyn AnalysisCache>> {
    match &config.cache_dir {
        Some(dir) => Ok(Arc::new(FileAnalysisCache::open(dir).await?)),
        None => {
            warn!("SMARTFILL_CACHE_DIR not set, analyses will not persist");
            Ok(Arc::new(MemoryAnalysisCache::new()))
        }
    }
}
