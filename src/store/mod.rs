//! Object store abstraction.
//!
//! The sync engine talks to the remote store exclusively through the
//! [`ObjectStore`] trait, which mirrors the small capability surface the
//! engine needs: paginated listing, metadata reads, uploads, and batch
//! deletes. Production uses [`S3ObjectStore`]; tests substitute
//! [`MemoryObjectStore`].

mod memory_store;
mod s3_store;

pub use memory_store::{MemoryObjectStore, PutRecord};
pub use s3_store::S3ObjectStore;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

/// Metadata key under which each object's content digest is stored.
///
/// Written by every upload and read back during first-run seeding so other
/// instances can recover the last-uploaded hash without downloading content.
pub const HASH_METADATA_KEY: &str = "hash";

/// Hard protocol limit on keys per batch-delete call.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Boxed error cause preserved inside [`StoreError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by object store operations.
///
/// Each variant corresponds to one capability so callers can distinguish a
/// failed listing from a failed upload or delete.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Listing the bucket failed.
    #[error("couldn't list objects in bucket: {source}")]
    List {
        #[source]
        source: BoxError,
    },

    /// Reading object metadata failed.
    #[error("couldn't read metadata of object with key {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Uploading an object failed.
    #[error("couldn't upload object with key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Deleting a batch of objects failed.
    #[error("couldn't delete stale objects in bucket: {source}")]
    Delete {
        #[source]
        source: BoxError,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// =============================================================================
// Request/Response Types
// =============================================================================

/// One page of a bucket listing.
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Keys in this page, in the store's listing order.
    pub keys: Vec<String>,
    /// True if further pages remain.
    pub is_truncated: bool,
}

/// An upload request.
///
/// The body is streamed from `body_path` by the store implementation so
/// large files are never held in memory whole.
#[derive(Debug)]
pub struct PutRequest<'a> {
    /// Destination key.
    pub key: &'a str,
    /// Local file supplying the body.
    pub body_path: &'a Path,
    /// Resolved content type.
    pub content_type: &'a str,
    /// Resolved cache-control directive.
    pub cache_control: &'a str,
    /// Content digest, stored as object metadata under
    /// [`HASH_METADATA_KEY`].
    pub digest: &'a str,
}

// =============================================================================
// ObjectStore Trait
// =============================================================================

/// Capability surface of the remote object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of the bucket listing.
    ///
    /// `marker` is the last key of the previous page, or None for the first
    /// page. The page size is owned by the store; callers must loop until
    /// `is_truncated` is false.
    async fn list_page(&self, marker: Option<&str>) -> Result<ListPage>;

    /// Fetch the user metadata of an object.
    async fn head_metadata(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Upload an object.
    async fn put_object(&self, request: PutRequest<'_>) -> Result<()>;

    /// Delete a batch of objects.
    ///
    /// Accepts at most [`MAX_DELETE_BATCH`] keys per call; chunking is the
    /// caller's responsibility.
    async fn delete_objects(&self, keys: &[String]) -> Result<()>;
}
