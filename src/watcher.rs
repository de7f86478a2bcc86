//! The poll loop.
//!
//! One cycle is fetch, diff, filter, notify and persist. Cycles run strictly
//! one after another, separated by the configured interval. The in-memory
//! snapshot lives here and nowhere else.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::diff;
use crate::models::Snapshot;
use crate::notify::{self, ListingFilter, Notifier};
use crate::scrapers::ListingSource;
use crate::storage::SnapshotStore;

#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub fetch_interval: Duration,
    pub message_delay: Duration,
    pub post_base_url: String,
    pub filter: ListingFilter,
}

/// Counters for a cycle that found new listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub fetched: usize,
    pub new: usize,
    pub excluded: usize,
    pub delivered: usize,
    pub failed: usize,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A page request failed; nothing from this cycle was kept.
    FetchFailed(String),
    /// The search returned no listings at all.
    NoData,
    NoNewEntries,
    Processed(CycleReport),
}

pub struct Watcher {
    source: Arc<dyn ListingSource>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn SnapshotStore>,
    options: WatcherOptions,
    snapshot: Snapshot,
}

impl Watcher {
    /// Build a watcher whose baseline is whatever the store has persisted.
    pub async fn new(
        source: Arc<dyn ListingSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SnapshotStore>,
        options: WatcherOptions,
    ) -> Self {
        let snapshot = store.load().await;
        info!("Baseline snapshot holds {} listings", snapshot.len());

        Self {
            source,
            notifier,
            store,
            options,
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let started_at = Utc::now();
        info!("Fetching new data...");

        let fetched = match self.source.fetch_all().await {
            Ok(fetched) if !fetched.is_empty() => fetched,
            Ok(_) => {
                warn!("Failed to fetch new data: search returned no listings.");
                return CycleOutcome::NoData;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch new data.");
                return CycleOutcome::FetchFailed(e.to_string());
            }
        };

        // The baseline only moves forward when something new was seen
        let added = diff::new_entries(&self.snapshot, &fetched);
        if added.is_empty() {
            info!("No new entries found.");
            return CycleOutcome::NoNewEntries;
        }

        info!("Found {} new entries. Sending updates...", added.len());
        let outbox = notify::prepare(&added, &self.options.filter, &self.options.post_base_url);
        let delivery =
            notify::deliver_all(self.notifier.as_ref(), &outbox.messages, self.options.message_delay)
                .await;

        let persisted = match self.store.save(&fetched).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Error saving new data");
                false
            }
        };

        let report = CycleReport {
            started_at,
            fetched: fetched.len(),
            new: added.len(),
            excluded: outbox.excluded,
            delivered: delivery.delivered,
            failed: delivery.failed,
            persisted,
        };
        self.snapshot = fetched;

        let elapsed = Utc::now() - started_at;
        info!(
            fetched = report.fetched,
            new = report.new,
            excluded = report.excluded,
            delivered = report.delivered,
            failed = report.failed,
            persisted = report.persisted,
            elapsed_ms = elapsed.num_milliseconds(),
            "✅ Cycle started at {} complete",
            started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        CycleOutcome::Processed(report)
    }

    /// Run one cycle, turning a panic inside it into a logged soft failure.
    async fn guarded_cycle(&mut self) -> Option<CycleOutcome> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(outcome) => Some(outcome),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("An unexpected error occurred: {}", message);
                None
            }
        }
    }

    /// Poll until `shutdown` turns true. The flag is honored between cycles
    /// and cuts the inter-cycle wait short; a running cycle always finishes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("🏠 Starting divar-watch...");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.guarded_cycle().await;

            if *shutdown.borrow() {
                break;
            }

            info!(
                "Waiting for {} seconds before next check...",
                self.options.fetch_interval.as_secs()
            );
            let wait = tokio::time::sleep(self.options.fetch_interval);
            tokio::pin!(wait);
            tokio::select! {
                _ = &mut wait => {}
                changed = shutdown.changed() => {
                    // Sender gone: nobody can ask us to stop any more
                    if changed.is_err() {
                        wait.await;
                    }
                }
            }
        }

        info!("divar-watch stopped by user.");
    }
}
