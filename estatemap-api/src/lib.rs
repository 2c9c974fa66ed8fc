//! Estatemap API - HTTP front end for the property map
//!
//! Serves classified listings from the refresh cache over REST (Axum),
//! backed by a Google Sheets fetcher.

pub mod config;
pub mod error;
pub mod routes;
pub mod sheets;
pub mod state;
pub mod telemetry;

pub use config::{ApiConfig, CredentialSource, EnvCredentials, SheetsConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use sheets::{ServiceAccountKey, SheetsClient, SheetsFetcher};
pub use state::{AppState, SourceProbe};
pub use telemetry::{init_tracing, InstrumentedFetcher, LogConfig};
