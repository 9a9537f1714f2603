//! Remote listing with pagination.

use std::collections::BTreeSet;

use super::error::Result;
use crate::config::IncludeFilter;
use crate::store::ObjectStore;

/// List every key in the bucket, then apply the filter.
///
/// Pages are requested sequentially, each continuing from the last key of
/// the previous page, until the store reports no further pages. The filter
/// runs over the aggregated set so page boundaries can never affect which
/// keys are visible.
pub async fn list_all(
    store: &dyn ObjectStore,
    filter: &IncludeFilter,
) -> Result<BTreeSet<String>> {
    let mut all_keys = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = store.list_page(marker.as_deref()).await?;
        let last_key = page.keys.last().cloned();
        all_keys.extend(page.keys);

        if !page.is_truncated {
            break;
        }
        match last_key {
            Some(key) => marker = Some(key),
            // A truncated page with no keys has no usable marker
            None => break,
        }
    }

    Ok(all_keys
        .into_iter()
        .filter(|key| filter.matches(key))
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
