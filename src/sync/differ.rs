//! Sync planning.
//!
//! Pure combination of the scanner's output with the loaded hash records.
//! No I/O happens here; the plan is deterministic given its inputs.

use std::collections::BTreeSet;

use super::scan::LocalFile;
use super::state::HashRecords;

/// The derived work for one run. Never persisted.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Files whose content must be uploaded this run.
    pub to_upload: Vec<LocalFile>,
    /// Every filtered local key, changed or not. Anything remote outside
    /// this set is a purge candidate.
    pub keys_to_keep: BTreeSet<String>,
}

/// Partition local files into upload work and the authoritative keep set.
///
/// A file needs upload when its key is missing from the records, recorded
/// with the unknown marker, or recorded with a different digest.
pub fn plan(local_files: &[LocalFile], records: &HashRecords) -> SyncPlan {
    let to_upload = local_files
        .iter()
        .filter(|file| match records.get(&file.key) {
            None => true,
            Some(None) => true,
            Some(Some(digest)) => digest != &file.digest,
        })
        .cloned()
        .collect();

    let keys_to_keep = local_files.iter().map(|file| file.key.clone()).collect();

    SyncPlan {
        to_upload,
        keys_to_keep,
    }
}

// =============================================================================
// Tests
// =============================================================================
