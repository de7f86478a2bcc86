pub mod filter;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::NotifyError;
use crate::models::Listing;

pub use filter::{format_message, ListingFilter};
pub use telegram::TelegramNotifier;

/// Delivers one formatted message to the messaging channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<(), NotifyError>;
}

/// Outcome of delivering one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Messages ready to send, plus how many listings the filter dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    pub messages: Vec<String>,
    pub excluded: usize,
}

/// Filter and render new listings, keeping their order.
pub fn prepare(entries: &[Listing], filter: &ListingFilter, base_url: &str) -> Outbox {
    let mut outbox = Outbox::default();

    for entry in entries {
        let summary = match entry.summary() {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Skipping listing");
                continue;
            }
        };

        if let Some(reason) = filter.exclusion(&summary) {
            debug!(token = %summary.token, ?reason, "Excluded: {}", summary.title);
            outbox.excluded += 1;
            continue;
        }

        outbox.messages.push(format_message(&summary, base_url));
    }

    outbox
}

/// Send messages one at a time with `delay` between consecutive sends. A
/// failed message is logged and skipped; it is never retried here.
pub async fn deliver_all<N: Notifier + ?Sized>(
    notifier: &N,
    messages: &[String],
    delay: Duration,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }

        match notifier.deliver(message).await {
            Ok(()) => {
                report.delivered += 1;
                info!("Sent update {}/{}", i + 1, messages.len());
            }
            Err(e) => {
                report.failed += 1;
                error!(error = %e, "Error sending update {}/{}", i + 1, messages.len());
            }
        }
    }

    report
}
