//! Shared application state.

use async_trait::async_trait;
use estatemap_cache::PropertyService;
use estatemap_core::FetchError;
use std::sync::Arc;
use std::time::Instant;

/// Readiness check against the upstream source.
#[async_trait]
pub trait SourceProbe: Send + Sync {
    /// Returns a short description of the source (e.g. the spreadsheet title).
    async fn probe(&self) -> Result<String, FetchError>;
}

/// Handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub service: PropertyService,
    pub probe: Arc<dyn SourceProbe>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: PropertyService, probe: Arc<dyn SourceProbe>) -> Self {
        Self {
            service,
            probe,
            started_at: Instant::now(),
        }
    }
}
