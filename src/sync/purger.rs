//! Deletion of stale remote objects.

use std::collections::BTreeSet;

use futures::future::join_all;

use super::error::Result;
use crate::store::{MAX_DELETE_BATCH, ObjectStore};

/// Delete every remote key not present in the keep set.
///
/// The delete set is chunked at the store's batch limit; chunks are
/// independent and dispatched concurrently. Returns the number of keys
/// deleted. With an empty delete set no store call is made.
pub async fn purge(
    store: &dyn ObjectStore,
    remote_keys: &BTreeSet<String>,
    keys_to_keep: &BTreeSet<String>,
) -> Result<usize> {
    let stale: Vec<String> = remote_keys.difference(keys_to_keep).cloned().collect();
    if stale.is_empty() {
        return Ok(0);
    }

    for key in &stale {
        tracing::info!(key = %key, "delete");
    }

    let tasks = stale
        .chunks(MAX_DELETE_BATCH)
        .map(|chunk| store.delete_objects(chunk));
    for result in join_all(tasks).await {
        result?;
    }

    Ok(stale.len())
}

// =============================================================================
// Tests
// =============================================================================
