//! Cache reads with freshness metadata.

use chrono::{DateTime, Utc};
use estatemap_core::{DatasetKey, Record};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One stored dataset snapshot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset_key: DatasetKey,
    pub records: Arc<[Record]>,
    /// Monotonic insertion time; drives TTL and eviction.
    pub inserted_at: Instant,
    /// Wall-clock insertion time, for reporting only.
    pub cached_at: DateTime<Utc>,
    /// Insertion sequence number. Breaks ties between equal `inserted_at`.
    pub generation: u64,
}

impl CacheEntry {
    pub fn new(dataset_key: DatasetKey, records: Vec<Record>, generation: u64) -> Self {
        Self {
            dataset_key,
            records: records.into(),
            inserted_at: Instant::now(),
            cached_at: Utc::now(),
            generation,
        }
    }

    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Result of a cache read.
///
/// Wraps the records with where they came from, so callers can report
/// hit/miss and data age without a second lookup.
#[derive(Debug, Clone)]
pub struct CacheRead {
    entry: CacheEntry,
    was_cache_hit: bool,
}

impl CacheRead {
    pub(crate) fn hit(entry: CacheEntry) -> Self {
        Self {
            entry,
            was_cache_hit: true,
        }
    }

    pub(crate) fn fetched(entry: CacheEntry) -> Self {
        Self {
            entry,
            was_cache_hit: false,
        }
    }

    pub fn dataset_key(&self) -> &DatasetKey {
        &self.entry.dataset_key
    }

    pub fn records(&self) -> &[Record] {
        &self.entry.records
    }

    /// Shared handle to the cached slice.
    pub fn shared_records(&self) -> Arc<[Record]> {
        Arc::clone(&self.entry.records)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.entry.records.to_vec()
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.entry.cached_at
    }

    pub fn age(&self) -> Duration {
        self.entry.age()
    }

    pub fn len(&self) -> usize {
        self.entry.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.records.is_empty()
    }
}
