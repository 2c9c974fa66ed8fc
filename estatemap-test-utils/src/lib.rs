//! Estatemap Test Utilities
//!
//! Shared test infrastructure for the estatemap workspace:
//! - A scriptable mock source fetcher
//! - Proptest generators for rows and status cells
//! - Fixtures for common row shapes
//! - Assertions for fetch outcomes and record sets

pub use estatemap_cache::{CacheConfig, PropertyService, RefreshCache, SourceFetcher};
pub use estatemap_core::{
    columns, Category, DatasetKey, DatasetRegistry, DatasetSpec, FetchError, RawRow, Record,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// Holds fetches until opened. Opening is sticky until [`close`](Self::close).
#[derive(Debug, Clone)]
pub struct FetchGate {
    open: Arc<watch::Sender<bool>>,
}

impl FetchGate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self {
            open: Arc::new(open),
        }
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives as long as the gate, so this only ends when opened.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for FetchGate {
    fn default() -> Self {
        Self::new()
    }
}

type Scripted = Result<Vec<RawRow>, FetchError>;

/// Mock source fetcher with per-key scripted responses and call counting.
///
/// Keys without a scripted response get [`fixtures::sample_rows`].
/// Calls are counted before any delay or gate, so a test can observe that a
/// fetch started while it is still held.
#[derive(Debug, Default)]
pub struct MockSourceFetcher {
    responses: Mutex<HashMap<DatasetKey, Scripted>>,
    calls: AtomicUsize,
    calls_by_key: Mutex<HashMap<DatasetKey, usize>>,
    delay: Option<Duration>,
    gate: Option<FetchGate>,
}

impl MockSourceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, key: &str, rows: Vec<RawRow>) -> Self {
        self.respond(key, Ok(rows));
        self
    }

    pub fn with_error(self, key: &str, error: FetchError) -> Self {
        self.respond(key, Err(error));
        self
    }

    /// Sleep this long (tokio time) inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_gate(mut self, gate: FetchGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Replace the scripted response for `key`. Usable while shared.
    pub fn respond(&self, key: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(DatasetKey::new(key), response);
    }

    /// Total fetch calls across all keys.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls_by_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&DatasetKey::new(key))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SourceFetcher for MockSourceFetcher {
    async fn fetch(&self, spec: &DatasetSpec) -> Result<Vec<RawRow>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(spec.key.clone())
            .or_insert(0) += 1;

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&spec.key)
            .cloned()
            .unwrap_or_else(|| Ok(fixtures::sample_rows()))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for estatemap inputs.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_dataset_key() -> impl Strategy<Value = DatasetKey> {
        prop_oneof![
            Just(DatasetKey::new("강남월세")),
            Just(DatasetKey::new("강남전세")),
            Just(DatasetKey::new("송파월세")),
            Just(DatasetKey::new("송파전세")),
        ]
    }

    /// Any key, registered or not.
    pub fn arb_any_dataset_key() -> impl Strategy<Value = DatasetKey> {
        prop_oneof![arb_dataset_key(), "[가-힣]{2,4}".prop_map(DatasetKey::new),]
    }

    pub fn arb_category() -> impl Strategy<Value = Category> {
        prop_oneof![
            Just(Category::Alpha),
            Just(Category::Beta),
            Just(Category::Gamma),
            Just(Category::Unclassified),
        ]
    }

    /// Status cells as they show up in practice: blanks, labels with odd
    /// spacing, boolean-style marks and free-text noise.
    pub fn arb_status_cell() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            Just("온하".to_string()),
            Just(" 공클 ".to_string()),
            Just("갠매\u{a0}".to_string()),
            Just("공클 진행중".to_string()),
            Just("O".to_string()),
            Just("yes".to_string()),
            Just("1".to_string()),
            Just("예".to_string()),
            Just("x".to_string()),
            Just("보류".to_string()),
            "[a-z가-힣 ]{0,6}",
        ]
    }

    /// Ragged row of arbitrary cells.
    pub fn arb_raw_row() -> impl Strategy<Value = RawRow> {
        proptest::collection::vec(".{0,6}", 0..24).prop_map(RawRow::new)
    }

    /// Row with a non-empty id and location and arbitrary status cells.
    pub fn arb_classifiable_row() -> impl Strategy<Value = RawRow> {
        (
            "[0-9]{1,8}",
            "[가-힣]{2,5}",
            arb_status_cell(),
            arb_status_cell(),
            arb_status_cell(),
        )
            .prop_map(|(id, location, alpha, beta, gamma)| {
                fixtures::row(&id, &location, &alpha, &beta, &gamma)
            })
    }

    pub fn arb_rows(max: usize) -> impl Strategy<Value = Vec<RawRow>> {
        proptest::collection::vec(prop_oneof![arb_classifiable_row(), arb_raw_row()], 0..max)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows and services.

    use super::*;

    /// A 20-column row with the record and status columns filled.
    pub fn row(id: &str, location: &str, alpha: &str, beta: &str, gamma: &str) -> RawRow {
        let mut cells = vec![String::new(); 20];
        cells[columns::ID] = id.to_string();
        cells[columns::REG_DATE] = "2024-05-01".to_string();
        cells[columns::DEPOSIT] = "5000".to_string();
        cells[columns::MONTHLY_RENT] = "100".to_string();
        cells[columns::LOCATION] = location.to_string();
        cells[columns::STATUS_ALPHA] = alpha.to_string();
        cells[columns::STATUS_BETA] = beta.to_string();
        cells[columns::STATUS_GAMMA] = gamma.to_string();
        RawRow::new(cells)
    }

    /// One row per category, one unclassified row and one without a location.
    ///
    /// Classifies to ids `["101", "102", "103"]`.
    pub fn sample_rows() -> Vec<RawRow> {
        vec![
            row("101", "역삼동", "온하", "", ""),
            row("102", "삼성동", "", "공클", ""),
            row("103", "잠실동", "", "", "갠매"),
            row("104", "문정동", "", "", ""),
            row("105", "", "온하", "", ""),
        ]
    }

    /// Ids produced by classifying [`sample_rows`].
    pub const SAMPLE_IDS: [&str; 3] = ["101", "102", "103"];

    pub fn dataset_keys() -> Vec<DatasetKey> {
        DatasetRegistry::default().keys().cloned().collect()
    }

    /// Registry with `count` synthetic datasets named `ds0..`.
    pub fn registry_of(count: usize) -> DatasetRegistry {
        let specs = (0..count)
            .map(|i| DatasetSpec::new(format!("ds{}", i), format!("'[ds{}]'!A5:T", i)))
            .collect();
        DatasetRegistry::new(specs).unwrap_or_else(|err| panic!("invalid test registry: {}", err))
    }

    pub fn service(fetcher: Arc<MockSourceFetcher>, config: CacheConfig) -> PropertyService {
        PropertyService::new(fetcher, DatasetRegistry::default(), config)
            .unwrap_or_else(|err| panic!("invalid test cache config: {}", err))
    }

    pub fn cache_with(
        fetcher: Arc<MockSourceFetcher>,
        registry: DatasetRegistry,
        config: CacheConfig,
    ) -> RefreshCache {
        RefreshCache::new(fetcher, Arc::new(registry), config)
            .unwrap_or_else(|err| panic!("invalid test cache config: {}", err))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for fetch outcomes and record sets.

    use super::*;

    #[track_caller]
    pub fn assert_source_unavailable<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::SourceUnavailable { .. }) => {}
            other => panic!("Expected SourceUnavailable, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_invalid_key<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::InvalidDatasetKey { .. }) => {}
            other => panic!("Expected InvalidDatasetKey, got: {:?}", other),
        }
    }

    /// Every record carries one of the three exposed categories.
    #[track_caller]
    pub fn assert_all_classified(records: &[Record]) {
        for record in records {
            assert!(
                record.status.is_classified(),
                "record {} leaked with status {:?}",
                record.id,
                record.status
            );
        }
    }

    #[track_caller]
    pub fn assert_ids(records: &[Record], expected: &[&str]) {
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected);
    }
}
