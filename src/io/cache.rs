use crate::types::{CacheKey, RadarError, RadarResult, ResampledGrid};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// External store for resampled grids
pub trait GridCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> RadarResult<Option<Arc<ResampledGrid>>>;

    fn put(&self, key: CacheKey, grid: Arc<ResampledGrid>) -> RadarResult<()>;
}

/// Unbounded in-process grid cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Arc<ResampledGrid>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl GridCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> RadarResult<Option<Arc<ResampledGrid>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RadarError::Cache(format!("Cache lock poisoned: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: CacheKey, grid: Arc<ResampledGrid>) -> RadarResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RadarError::Cache(format!("Cache lock poisoned: {}", e)))?;
        entries.insert(key, grid);
        Ok(())
    }
}
