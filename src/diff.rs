//! New-entry detection between two snapshots.
//!
//! Identity is the listing token. Records without a token never take part:
//! they are neither a baseline id nor ever reported as new.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::Listing;

/// Records of `new` whose token is absent from `old`, in `new`'s order.
pub fn new_entries(old: &[Listing], new: &[Listing]) -> Vec<Listing> {
    let mut old_ids: HashSet<&str> = HashSet::with_capacity(old.len());
    for entry in old {
        match entry.token() {
            Some(token) => {
                old_ids.insert(token);
            }
            None => warn!(entry = %entry.raw(), "Token not found in old entry"),
        }
    }

    let added: Vec<Listing> = new
        .iter()
        .filter(|entry| match entry.token() {
            Some(token) => !old_ids.contains(token),
            None => {
                warn!(entry = %entry.raw(), "Token not found in new entry");
                false
            }
        })
        .cloned()
        .collect();

    debug!("Identified {} new entries.", added.len());
    added
}
