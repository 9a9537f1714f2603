//! The synchronization engine.
//!
//! One run publishes a local tree to the remote store:
//! - [`scan`] enumerates and hashes local files
//! - [`state`] persists the key-to-digest record between runs
//! - [`lister`] aggregates the paginated remote listing
//! - [`differ`] turns scan output plus records into a [`SyncPlan`]
//! - [`uploader`] performs concurrency-bounded uploads
//! - [`purger`] batch-deletes remote keys absent locally
//! - [`run_sync`] wires the phases together

pub mod differ;
mod error;
pub mod lister;
pub mod purger;
mod run_sync;
mod scan;
mod state;
pub mod uploader;

pub use differ::SyncPlan;
pub use error::{Result, SyncError};
pub use run_sync::{SyncReport, run_sync};
pub use scan::{LocalFile, scan_local_files};
pub use state::{HashRecords, HashStateStore};
