use async_trait::async_trait;
use dashmap::DashMap;

use super::{current_version, AnalysisCache};
use crate::error::Result;
use crate::model::PhotoAnalysis;

/// In-memory analysis cache; contents are lost when dropped.
#[derive(Default)]
pub struct MemoryAnalysisCache {
    records: DashMap<String, PhotoAnalysis>,
}

impl MemoryAnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AnalysisCache for MemoryAnalysisCache {
    async fn get(&self, photo_id: &str) -> Result<Option<PhotoAnalysis>> {
        let record = self.records.get(photo_id).map(|r| r.value().clone());
        Ok(current_version(record))
    }

    async fn put(&self, analysis: &PhotoAnalysis) -> Result<()> {
        self.records.insert(analysis.id.clone(), analysis.clone());
        Ok(())
    }

    async fn remove(&self, photo_id: &str) -> Result<()> {
        self.records.remove(photo_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryAnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAnalysisCache")
            .field("records", &self.records.len())
            .finish()
    }
}
