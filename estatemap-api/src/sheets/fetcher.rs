//! Google Sheets source fetcher.

use async_trait::async_trait;
use estatemap_cache::SourceFetcher;
use estatemap_core::{DatasetSpec, FetchError, RawRow};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::client::SheetsClient;
use crate::config::SheetsConfig;
use crate::state::SourceProbe;

/// [`SourceFetcher`] over the Sheets `values.get` endpoint.
///
/// The client is built on first use, once. A failed build is not kept, so
/// the next fetch tries again (e.g. after credentials are mounted).
#[derive(Debug)]
pub struct SheetsFetcher {
    config: SheetsConfig,
    client: OnceCell<SheetsClient>,
}

impl SheetsFetcher {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    pub async fn client(&self) -> Result<&SheetsClient, FetchError> {
        self.client
            .get_or_try_init(|| async {
                SheetsClient::new(&self.config).await.map_err(|e| {
                    warn!(error = %e, "failed to build sheets client");
                    FetchError::unavailable(format!("sheets client unavailable: {}", e))
                })
            })
            .await
    }
}

#[async_trait]
impl SourceFetcher for SheetsFetcher {
    async fn fetch(&self, spec: &DatasetSpec) -> Result<Vec<RawRow>, FetchError> {
        let client = self.client().await?;
        let started = Instant::now();
        let rows = client.values(&spec.range).await?;
        debug!(
            dataset = %spec.key,
            range = %spec.range,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched sheet range"
        );
        Ok(rows)
    }
}

#[async_trait]
impl SourceProbe for SheetsFetcher {
    async fn probe(&self) -> Result<String, FetchError> {
        self.client().await?.spreadsheet_title().await
    }
}
