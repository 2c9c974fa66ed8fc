//! Google Sheets source: service-account auth, REST client, fetcher.

pub mod auth;
pub mod client;
pub mod fetcher;

pub use auth::{ServiceAccountKey, TokenSource, SHEETS_READONLY_SCOPE};
pub use client::{cell_to_string, parse_values, status_error, SheetsClient};
pub use fetcher::SheetsFetcher;
