//! Persistence of the last-seen snapshot.
//!
//! The snapshot file is a pretty-printed JSON array holding every listing
//! document exactly as the search API returned it.

pub mod json;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::Snapshot;

pub use json::JsonSnapshotStore;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Previously persisted snapshot. Missing or unreadable state yields an
    /// empty snapshot; this never fails.
    async fn load(&self) -> Snapshot;

    /// Replace the persisted snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
