//! Source fetcher trait.

use async_trait::async_trait;
use estatemap_core::{DatasetSpec, FetchError, RawRow};
use std::sync::Arc;

/// Retrieves the raw rows of one dataset from the upstream provider.
///
/// The cache resolves the dataset key against its registry before calling,
/// so implementations receive the configured range rather than a bare key.
/// Every failure must be reported as one of the [`FetchError`] kinds.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch all rows for `spec.range`, in source order.
    async fn fetch(&self, spec: &DatasetSpec) -> Result<Vec<RawRow>, FetchError>;
}

#[async_trait]
impl<T: SourceFetcher + ?Sized> SourceFetcher for Arc<T> {
    async fn fetch(&self, spec: &DatasetSpec) -> Result<Vec<RawRow>, FetchError> {
        (**self).fetch(spec).await
    }
}
