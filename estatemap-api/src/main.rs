//! Estatemap API Server Entry Point
//!
//! Bootstraps configuration, wires the Sheets fetcher into the refresh
//! cache, and starts the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use estatemap_api::{
    create_api_router, init_tracing, ApiConfig, ApiError, ApiResult, AppState,
    InstrumentedFetcher, LogConfig, SheetsConfig, SheetsFetcher, SourceProbe,
};
use estatemap_cache::PropertyService;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&LogConfig::from_env())?;

    let api_config = ApiConfig::from_env()?;
    let registry = api_config.dataset_registry()?;
    tracing::info!(
        datasets = registry.len(),
        ttl_secs = api_config.cache.ttl.as_secs(),
        capacity = api_config.cache.capacity,
        "dataset registry loaded"
    );

    let sheets = Arc::new(SheetsFetcher::new(SheetsConfig::from_env()?));
    let service = PropertyService::new(
        Arc::new(InstrumentedFetcher::new(sheets.clone())),
        registry,
        api_config.cache.clone(),
    )?;

    // Startup continues without a reachable source; requests retry the client build.
    match sheets.probe().await {
        Ok(title) => tracing::info!(%title, "connected to spreadsheet"),
        Err(e) => tracing::warn!(error = %e, "spreadsheet not reachable at startup"),
    }

    let state = AppState::new(service, sheets);
    let app: Router = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting estatemap API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
