//! Concurrent uploads with content-type and cache-control policy.

use std::path::Path;

use futures::future::join_all;

use super::error::Result;
use super::scan::LocalFile;
use crate::store::{ObjectStore, PutRequest};
use crate::util::CapacityManager;

/// Cache directive for content that may be replaced between deploys.
pub const CACHE_CONTROL_NO_CACHE: &str = "no-cache";

/// Cache directive for immutable-by-convention content: one year.
pub const CACHE_CONTROL_LONG_LIVED: &str = "max-age=31536000";

/// Fallback content type for unknown extensions.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Resolve the content type from a key's file extension.
pub fn content_type_for(key: &str) -> &'static str {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Resolve the cache-control directive for a content type.
///
/// HTML and JSON are entry points that must always be revalidated; every
/// other type gets the long-lived directive.
pub fn cache_control_for(content_type: &str) -> &'static str {
    if content_type.starts_with("text/html") || content_type.starts_with("application/json") {
        CACHE_CONTROL_NO_CACHE
    } else {
        CACHE_CONTROL_LONG_LIVED
    }
}

/// Upload every file in the plan, tagging each object with its digest.
///
/// All uploads are dispatched at once; each task holds one permit from the
/// shared limiter while its request is in flight. The first failure
/// surfaces after all tasks settle; completed uploads are not rolled back.
pub async fn upload_files(
    store: &dyn ObjectStore,
    root: &Path,
    files: &[LocalFile],
    limiter: &CapacityManager,
) -> Result<()> {
    let tasks = files.iter().map(|file| async move {
        let _permit = limiter.use_capacity(1).await;

        let body_path = root.join(Path::new(&file.key));
        let content_type = content_type_for(&file.key);
        let cache_control = cache_control_for(content_type);

        store
            .put_object(PutRequest {
                key: &file.key,
                body_path: &body_path,
                content_type,
                cache_control,
                digest: &file.digest,
            })
            .await?;

        tracing::info!(key = %file.key, "upload");
        Ok::<(), super::SyncError>(())
    });

    for result in join_all(tasks).await {
        result?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
