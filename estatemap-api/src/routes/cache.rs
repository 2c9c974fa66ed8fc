//! Cache management endpoints.

use axum::{extract::State, routing::{get, post}, Json, Router};
use estatemap_cache::CacheStats;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub evictions: u64,
    pub entry_count: u64,
    pub hit_rate: f64,
    /// Cached dataset keys, oldest first.
    pub cached: Vec<String>,
}

impl StatsResponse {
    fn new(stats: CacheStats, cached: Vec<String>) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            fetches: stats.fetches,
            fetch_failures: stats.fetch_failures,
            evictions: stats.evictions,
            entry_count: stats.entry_count,
            hit_rate: stats.hit_rate(),
            cached,
        }
    }
}

/// POST /api/cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.service.clear_cache();
    info!(removed, "cache cleared on request");
    Json(ClearResponse { cleared: true })
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let cached = state
        .service
        .cache()
        .cached_keys()
        .into_iter()
        .map(|k| k.as_str().to_string())
        .collect();
    Json(StatsResponse::new(state.service.stats(), cached))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/clear", post(clear_cache))
        .route("/stats", get(cache_stats))
}
