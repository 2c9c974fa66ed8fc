//! Estatemap Cache - Coalescing Refresh Cache
//!
//! Sits between callers and a [`SourceFetcher`]. Each dataset is fetched,
//! normalized and classified once per TTL window, no matter how many
//! callers ask for it concurrently.
//!
//! # Example
//!
//! ```ignore
//! let service = PropertyService::new(fetcher, DatasetRegistry::default(), CacheConfig::default())?;
//! let records = service.get_property_data("강남월세").await;
//! ```

pub mod config;
pub mod fetcher;
pub mod read;
pub mod refresh;
pub mod service;
pub mod stats;

pub use config::{CacheConfig, DEFAULT_CAPACITY, DEFAULT_FETCH_TIMEOUT, DEFAULT_TTL};
pub use fetcher::SourceFetcher;
pub use read::{CacheEntry, CacheRead};
pub use refresh::{EntryState, RefreshCache};
pub use service::PropertyService;
pub use stats::CacheStats;
