//! Property service facade.

use estatemap_cache::{CacheConfig, PropertyService};
use estatemap_core::{
    classify_rows, Category, DatasetKey, DatasetRegistry, FetchError, RecordNormalizer,
    StatusClassifier,
};
use estatemap_test_utils::assertions::{assert_all_classified, assert_ids};
use estatemap_test_utils::fixtures::{self, row, SAMPLE_IDS};
use estatemap_test_utils::generators::arb_rows;
use estatemap_test_utils::MockSourceFetcher;
use proptest::prelude::*;
use std::sync::Arc;

fn service(fetcher: MockSourceFetcher) -> (Arc<MockSourceFetcher>, PropertyService) {
    let fetcher = Arc::new(fetcher);
    (fetcher.clone(), fixtures::service(fetcher, CacheConfig::default()))
}

#[tokio::test]
async fn test_get_property_data_returns_classified_records() {
    let (_, service) = service(MockSourceFetcher::new());

    let records = service.get_property_data("강남월세").await;
    assert_ids(&records, &SAMPLE_IDS);
    assert_all_classified(&records);
    assert_eq!(records[0].status, Category::Alpha);
    assert_eq!(records[1].status, Category::Beta);
    assert_eq!(records[2].status, Category::Gamma);
    assert!(records.iter().all(|r| r.dataset_key.as_str() == "강남월세"));
}

#[tokio::test]
async fn test_all_empty_status_row_is_excluded() {
    let fetcher = MockSourceFetcher::new().with_rows(
        "송파전세",
        vec![row("1", "가락동", "", "", ""), row("2", "가락동", "", "", "o")],
    );
    let (_, service) = service(fetcher);

    let records = service.get_property_data("송파전세").await;
    assert_ids(&records, &["2"]);
}

#[tokio::test]
async fn test_failure_degrades_to_empty() {
    let fetcher =
        MockSourceFetcher::new().with_error("강남전세", FetchError::unavailable("auth rejected"));
    let (_, service) = service(fetcher);

    assert!(service.get_property_data("강남전세").await.is_empty());
    assert!(service.get_property_data("없는시트").await.is_empty());

    let typed = service.try_get_property_data("강남전세").await;
    assert_eq!(typed.unwrap_err(), FetchError::unavailable("auth rejected"));
}

#[tokio::test]
async fn test_empty_dataset_is_not_an_error() {
    let fetcher = MockSourceFetcher::new().with_rows("송파월세", Vec::new());
    let (_, service) = service(fetcher);

    let read = service.try_get_property_data("송파월세").await.unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let (fetcher, service) = service(MockSourceFetcher::new());

    service.get_property_data("강남월세").await;
    service.get_property_data("강남월세").await;
    assert_eq!(fetcher.calls(), 1);

    assert_eq!(service.clear_cache(), 1);
    service.get_property_data("강남월세").await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_datasets_lists_registry() {
    let (_, service) = service(MockSourceFetcher::new());
    let keys: Vec<&str> = service.datasets().map(|spec| spec.key.as_str()).collect();
    assert_eq!(keys, vec!["강남월세", "강남전세", "송파월세", "송파전세"]);
}

#[tokio::test]
async fn test_service_clones_share_cache() {
    let (fetcher, service) = service(MockSourceFetcher::new());
    let other = service.clone();

    service.get_property_data("송파전세").await;
    other.get_property_data("송파전세").await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(other.stats().hits, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_service_output_matches_batch_pipeline(rows in arb_rows(40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let fetcher = MockSourceFetcher::new().with_rows("강남월세", rows.clone());
        let (_, service) = service(fetcher);

        let records = runtime.block_on(service.get_property_data("강남월세"));

        let expected = classify_rows(
            &rows,
            &DatasetKey::new("강남월세"),
            &RecordNormalizer::new(),
            &StatusClassifier::from_registry(&DatasetRegistry::default()),
        );
        prop_assert_eq!(&records, &expected.records);
        prop_assert!(records.iter().all(|r| r.status.is_classified()));
        prop_assert!(records.iter().all(|r| !r.id.is_empty() && !r.location.is_empty()));
    }
}
