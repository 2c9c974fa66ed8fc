//! Property service: the facade callers hold.

use crate::{CacheConfig, CacheRead, CacheStats, RefreshCache, SourceFetcher};
use estatemap_core::{ConfigError, DatasetKey, DatasetRegistry, DatasetSpec, FetchError, Record};
use std::sync::Arc;
use tracing::warn;

/// Owns the refresh cache and its upstream fetcher.
///
/// Constructed once at startup and shared by reference; cloning is cheap.
#[derive(Debug, Clone)]
pub struct PropertyService {
    cache: Arc<RefreshCache>,
}

impl PropertyService {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        registry: DatasetRegistry,
        config: CacheConfig,
    ) -> Result<Self, ConfigError> {
        let cache = RefreshCache::new(fetcher, Arc::new(registry), config)?;
        Ok(Self {
            cache: Arc::new(cache),
        })
    }

    /// Records for a dataset, or an empty list on any failure.
    ///
    /// The failure is logged; callers that need to tell "no data" from
    /// "fetch failed" use [`try_get_property_data`](Self::try_get_property_data).
    pub async fn get_property_data(&self, key: &str) -> Vec<Record> {
        match self.try_get_property_data(key).await {
            Ok(read) => read.into_records(),
            Err(err) => {
                warn!(dataset = key, kind = err.kind(), error = %err, "returning empty dataset");
                Vec::new()
            }
        }
    }

    pub async fn try_get_property_data(&self, key: &str) -> Result<CacheRead, FetchError> {
        self.cache.get(&DatasetKey::new(key)).await
    }

    /// Clear the whole cache.
    pub fn clear_cache(&self) -> usize {
        self.cache.invalidate()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.cache.registry().iter()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &RefreshCache {
        &self.cache
    }
}
