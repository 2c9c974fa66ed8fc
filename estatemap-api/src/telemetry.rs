//! Logging and Prometheus metrics.

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use estatemap_cache::SourceFetcher;
use estatemap_core::{DatasetSpec, FetchError, RawRow};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// LOGGING
// ============================================================================

pub const DEFAULT_LOG_FILTER: &str = "estatemap_api=debug,estatemap_cache=debug,tower_http=info,info";
/// Used when running on the production host.
pub const PRODUCTION_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub json: bool,
    /// Default filter when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl LogConfig {
    /// `ESTATEMAP_LOG_FORMAT=json` selects JSON lines; a set `RENDER`
    /// variable marks the production host and lowers the default to warn.
    pub fn from_env() -> Self {
        let json = std::env::var("ESTATEMAP_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let production = std::env::var_os("RENDER").is_some();
        Self {
            json,
            default_filter: if production {
                PRODUCTION_LOG_FILTER
            } else {
                DEFAULT_LOG_FILTER
            }
            .to_string(),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LogConfig) -> ApiResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to initialize tracing: {}", e)))
}

// ============================================================================
// METRICS
// ============================================================================

const FETCH_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0];

/// `dataset` label for requested keys that are not configured.
pub const UNKNOWN_DATASET_LABEL: &str = "unknown";

/// Global metrics instance - initialized once on first use.
pub static METRICS: Lazy<ApiResult<EstateMetrics>> = Lazy::new(EstateMetrics::new);

pub struct EstateMetrics {
    /// Property reads - labels: dataset, outcome (hit/miss/error)
    pub cache_requests_total: CounterVec,

    /// Upstream fetches - labels: dataset, status (ok/failed)
    pub fetches_total: CounterVec,

    /// Upstream fetch duration - labels: dataset
    pub fetch_duration_seconds: HistogramVec,

    /// Datasets currently cached
    pub cache_entries: IntGauge,
}

impl EstateMetrics {
    pub fn new() -> ApiResult<Self> {
        let registration = |name: &str, e: prometheus::Error| {
            ApiError::internal_error(format!("Failed to register {}: {}", name, e))
        };

        Ok(Self {
            cache_requests_total: register_counter_vec!(
                "estatemap_cache_requests_total",
                "Property reads by cache outcome",
                &["dataset", "outcome"]
            )
            .map_err(|e| registration("cache_requests_total", e))?,

            fetches_total: register_counter_vec!(
                "estatemap_fetches_total",
                "Upstream dataset fetches",
                &["dataset", "status"]
            )
            .map_err(|e| registration("fetches_total", e))?,

            fetch_duration_seconds: register_histogram_vec!(
                "estatemap_fetch_duration_seconds",
                "Upstream dataset fetch duration in seconds",
                &["dataset"],
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration("fetch_duration_seconds", e))?,

            cache_entries: register_int_gauge!(
                "estatemap_cache_entries",
                "Datasets currently held in the cache"
            )
            .map_err(|e| registration("cache_entries", e))?,
        })
    }

    pub fn record_cache_request(&self, dataset: &str, outcome: &str) {
        self.cache_requests_total
            .with_label_values(&[dataset, outcome])
            .inc();
    }

    pub fn record_fetch(&self, dataset: &str, ok: bool, duration_secs: f64) {
        let status = if ok { "ok" } else { "failed" };
        self.fetches_total.with_label_values(&[dataset, status]).inc();
        self.fetch_duration_seconds
            .with_label_values(&[dataset])
            .observe(duration_secs);
    }
}

/// The global metrics, if registration succeeded.
pub fn metrics() -> Option<&'static EstateMetrics> {
    METRICS.as_ref().ok()
}

/// Wraps a fetcher and records every upstream fetch.
#[derive(Debug)]
pub struct InstrumentedFetcher<F> {
    inner: F,
}

impl<F> InstrumentedFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: SourceFetcher> SourceFetcher for InstrumentedFetcher<F> {
    async fn fetch(&self, spec: &DatasetSpec) -> Result<Vec<RawRow>, FetchError> {
        let started = Instant::now();
        let result = self.inner.fetch(spec).await;
        if let Some(metrics) = metrics() {
            metrics.record_fetch(
                spec.key.as_str(),
                result.is_ok(),
                started.elapsed().as_secs_f64(),
            );
        }
        result
    }
}

/// GET /metrics - Prometheus text format
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(metrics) = metrics() {
        let entries = i64::try_from(state.service.stats().entry_count).unwrap_or(i64::MAX);
        metrics.cache_entries.set(entries);
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
