//! REST API Routes Module
//!
//! - Property listings under /api/properties/:dataset
//! - Cache management under /api/cache/*
//! - Dataset catalog at /api/datasets
//! - Health checks at /health and /health/* (Kubernetes-compatible)
//! - Prometheus metrics at /metrics
//! - CORS support for the browser map client

pub mod cache;
pub mod datasets;
pub mod health;
pub mod properties;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::metrics_handler;

pub use cache::create_router as cache_router;
pub use datasets::create_router as datasets_router;
pub use health::create_router as health_router;
pub use properties::create_router as properties_router;

/// Response header reporting whether a read was served from cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Build CORS layer from configuration.
///
/// If no origins are configured, allows all origins (development mode).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([X_CACHE])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let api_routes = Router::new()
        .nest("/properties", properties::create_router())
        .nest("/cache", cache::create_router())
        .nest("/datasets", datasets::create_router());

    Router::new()
        .nest("/api", api_routes)
        .merge(health::create_router())
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        let dev = ApiConfig::default();
        let _ = build_cors_layer(&dev);

        let prod = ApiConfig {
            cors_origins: vec!["https://map.example".to_string(), "not a header\n".to_string()],
            ..ApiConfig::default()
        };
        let _ = build_cors_layer(&prod);
    }
}
