use crate::error::FetchError;
use crate::models::Snapshot;
use crate::scrapers::traits::{ListingSource, SearchApi};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Walks every result page of a search, following the cursor of the last
/// record on each page.
pub struct ListingFetcher<A> {
    api: A,
    page_delay: Duration,
}

impl<A: SearchApi> ListingFetcher<A> {
    pub fn new(api: A, page_delay: Duration) -> Self {
        Self { api, page_delay }
    }
}

#[async_trait]
impl<A: SearchApi> ListingSource for ListingFetcher<A> {
    async fn fetch_all(&self) -> Result<Snapshot, FetchError> {
        let mut all = Snapshot::new();
        let mut cursor: Option<String> = None;
        let mut page = 1u32;

        loop {
            debug!("Fetching {} page {}", self.api.source_name(), page);
            let entries = self.api.search(cursor.as_deref(), page).await?;

            let Some(last) = entries.last() else {
                debug!("No more entries found.");
                break;
            };
            let next = last.cursor();
            all.extend(entries);

            match next {
                Some(c) if cursor.as_deref() == Some(c.as_str()) => {
                    warn!(cursor = %c, "Cursor did not advance. Stopping pagination.");
                    break;
                }
                Some(c) => cursor = Some(c),
                None => {
                    debug!("Last post date not found. Stopping pagination.");
                    break;
                }
            }

            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!("Fetched total of {} entries in {} request(s).", all.len(), page);
        Ok(all)
    }
}
