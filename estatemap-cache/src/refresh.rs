//! Refresh cache
//!
//! TTL-gated, capacity-bounded map from dataset key to classified records.
//!
//! A miss joins the key's in-flight refresh if one exists, otherwise it
//! starts one. Every caller attached to a flight receives the same outcome,
//! success or failure. Hits never wait on a flight; misses for different
//! keys never wait on each other.

use crate::fetcher::SourceFetcher;
use crate::read::{CacheEntry, CacheRead};
use crate::stats::{CacheStats, StatsRecorder};
use crate::CacheConfig;
use dashmap::DashMap;
use estatemap_core::{
    classify_rows, ConfigError, DatasetKey, DatasetRegistry, DatasetSpec, FetchError, Record,
    RecordNormalizer, StatusClassifier,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OnceCell;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

type RefreshOutcome = Result<CacheRead, FetchError>;
type Flight = OnceCell<RefreshOutcome>;

/// Observable state of one dataset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No entry and no refresh running.
    Absent,
    /// A refresh is running for the key.
    Fetching,
    /// Entry present and younger than the TTL.
    Cached,
    /// Entry present but expired; the next read refreshes it.
    Stale,
}

/// Coalescing refresh cache over a [`SourceFetcher`].
pub struct RefreshCache {
    fetcher: Arc<dyn SourceFetcher>,
    registry: Arc<DatasetRegistry>,
    normalizer: RecordNormalizer,
    classifier: StatusClassifier,
    config: CacheConfig,
    entries: RwLock<HashMap<DatasetKey, CacheEntry>>,
    in_flight: DashMap<DatasetKey, Arc<Flight>>,
    /// Bumped by `invalidate`; a refresh started under an older epoch is not stored.
    epoch: AtomicU64,
    generation: AtomicU64,
    stats: StatsRecorder,
}

impl std::fmt::Debug for RefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCache")
            .field("config", &self.config)
            .field("datasets", &self.registry.len())
            .field("entries", &self.read_entries().len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl RefreshCache {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        registry: Arc<DatasetRegistry>,
        config: CacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = StatusClassifier::from_registry(&registry);
        Ok(Self {
            fetcher,
            registry,
            normalizer: RecordNormalizer::new(),
            classifier,
            config,
            entries: RwLock::new(HashMap::new()),
            in_flight: DashMap::new(),
            epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            stats: StatsRecorder::default(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    /// Records for `key`, refreshing when absent or expired.
    ///
    /// Unknown keys fail with `InvalidDatasetKey` without touching the fetcher.
    /// A failed refresh leaves any existing entry in place. A miss answered by
    /// an entry another flight stored in the meantime is reported as a hit.
    pub async fn get(&self, key: &DatasetKey) -> Result<CacheRead, FetchError> {
        let Some(spec) = self.registry.get(key) else {
            warn!(dataset = %key, "no range configured for dataset");
            return Err(FetchError::invalid_key(key.as_str()));
        };

        if let Some(entry) = self.lookup_fresh(key) {
            self.stats.hit();
            debug!(dataset = %key, age_secs = entry.age().as_secs(), "cache hit");
            return Ok(CacheRead::hit(entry));
        }

        let flight = self.join_flight(key);
        let outcome = flight.get_or_init(|| self.refresh(spec)).await.clone();
        self.in_flight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &flight));

        match &outcome {
            Ok(read) if read.was_cache_hit() => self.stats.hit(),
            _ => self.stats.miss(),
        }
        outcome
    }

    /// Drop every entry. Refreshes already running complete for their
    /// waiters but are not stored.
    pub fn invalidate(&self) -> usize {
        let mut entries = self.write_entries();
        let cleared = entries.len();
        entries.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.in_flight.clear();
        info!(cleared, "cache invalidated");
        cleared
    }

    pub fn entry_state(&self, key: &DatasetKey) -> EntryState {
        let fetching = self
            .in_flight
            .get(key)
            .is_some_and(|flight| !flight.initialized());
        if fetching {
            return EntryState::Fetching;
        }
        match self.read_entries().get(key) {
            Some(entry) if entry.is_fresh(self.config.ttl) => EntryState::Cached,
            Some(_) => EntryState::Stale,
            None => EntryState::Absent,
        }
    }

    /// Keys currently stored, oldest first.
    pub fn cached_keys(&self) -> Vec<DatasetKey> {
        let entries = self.read_entries();
        let mut stored: Vec<&CacheEntry> = entries.values().collect();
        stored.sort_by_key(|entry| (entry.inserted_at, entry.generation));
        stored.into_iter().map(|e| e.dataset_key.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.read_entries().len())
    }

    fn lookup_fresh(&self, key: &DatasetKey) -> Option<CacheEntry> {
        self.read_entries()
            .get(key)
            .filter(|entry| entry.is_fresh(self.config.ttl))
            .cloned()
    }

    fn join_flight(&self, key: &DatasetKey) -> Arc<Flight> {
        let mut slot = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()));
        // A finished flight nobody cleaned up must not answer new misses.
        if slot.initialized() {
            *slot = Arc::new(OnceCell::new());
        }
        Arc::clone(slot.value())
    }

    async fn refresh(&self, spec: &DatasetSpec) -> RefreshOutcome {
        // Another flight may have stored the key between our miss and now.
        if let Some(entry) = self.lookup_fresh(&spec.key) {
            debug!(dataset = %spec.key, "stored by another flight");
            return Ok(CacheRead::hit(entry));
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let started = Instant::now();
        self.stats.fetch_started();
        debug!(dataset = %spec.key, range = %spec.range, "fetching dataset");

        let rows = match timeout(self.config.fetch_timeout, self.fetcher.fetch(spec)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => return Err(self.fetch_failed(spec, err)),
            Err(_) => {
                let err = FetchError::unavailable(format!(
                    "fetch timed out after {:?}",
                    self.config.fetch_timeout
                ));
                return Err(self.fetch_failed(spec, err));
            }
        };

        let batch = classify_rows(&rows, &spec.key, &self.normalizer, &self.classifier);
        info!(
            dataset = %spec.key,
            rows = rows.len(),
            records = batch.records.len(),
            alpha = batch.counts.alpha,
            beta = batch.counts.beta,
            gamma = batch.counts.gamma,
            dropped = batch.dropped,
            excluded = batch.excluded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset refreshed"
        );

        Ok(CacheRead::fetched(self.store(
            spec.key.clone(),
            batch.records,
            epoch,
        )))
    }

    fn fetch_failed(&self, spec: &DatasetSpec, err: FetchError) -> FetchError {
        self.stats.fetch_failed();
        warn!(dataset = %spec.key, kind = err.kind(), error = %err, "dataset refresh failed");
        err
    }

    fn store(&self, key: DatasetKey, records: Vec<Record>, epoch: u64) -> CacheEntry {
        let mut entries = self.write_entries();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(key, records, generation);

        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(dataset = %entry.dataset_key, "refresh superseded by invalidate; not stored");
            return entry;
        }

        entries.insert(entry.dataset_key.clone(), entry.clone());
        while entries.len() > self.config.capacity {
            let Some(oldest) = entries
                .values()
                .min_by_key(|e| (e.inserted_at, e.generation))
                .map(|e| e.dataset_key.clone())
            else {
                break;
            };
            entries.remove(&oldest);
            self.stats.evicted();
            debug!(dataset = %oldest, "evicted oldest cache entry");
        }
        entry
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<DatasetKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<DatasetKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
