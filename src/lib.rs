//! bucketsync - one-way publishing of a local directory tree to an
//! S3-compatible object store.
//!
//! Repeated runs are cheap and idempotent: a persisted key-to-digest record
//! limits uploads to new or changed files, and an optional purge phase
//! removes remote objects that no longer exist locally.

pub mod cli;
pub mod config;
pub mod store;
pub mod sync;
pub mod util;

pub use config::{IncludeFilter, SyncConfig};
pub use store::{ListPage, MemoryObjectStore, ObjectStore, PutRequest, S3ObjectStore, StoreError};
pub use sync::{HashRecords, HashStateStore, LocalFile, SyncError, SyncPlan, SyncReport, run_sync};
pub use util::{CapacityManager, UsedCapacity};
