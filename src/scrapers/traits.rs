use crate::error::FetchError;
use crate::models::{Listing, Snapshot};
use async_trait::async_trait;

/// One page request against a listing search endpoint
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Fetch a single page. `cursor` is `None` for the first page.
    async fn search(&self, cursor: Option<&str>, page: u32) -> Result<Vec<Listing>, FetchError>;

    /// Get the name of the upstream source
    fn source_name(&self) -> &'static str;
}

/// Produces the complete listing set for one poll cycle
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// All pages, or an error if any page failed
    async fn fetch_all(&self) -> Result<Snapshot, FetchError>;
}
