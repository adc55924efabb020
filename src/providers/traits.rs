use crate::models::{Listing, SearchStrategy};
use anyhow::Result;
use async_trait::async_trait;

/// Common contract for every listing source, live or synthetic
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Search the source for `query` in `city`, honouring the per-provider cap
    async fn search(&self, query: &str, city: &str, strategy: &SearchStrategy)
        -> Result<Vec<Listing>>;

    /// Identifier used in search strategies ("craigslist", "zillow", ...)
    fn source_name(&self) -> &'static str;
}
