//! Persisted hash state.
//!
//! The state file is a single JSON object mapping slash-normalized relative
//! keys to either a hex digest string or `null` (the unknown marker). It is
//! the sole record of "what was last uploaded with what content": rewritten
//! in full after each successful run, seeded from remote metadata when it
//! does not exist yet.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::Result;
use super::lister;
use crate::config::IncludeFilter;
use crate::store::{HASH_METADATA_KEY, ObjectStore};

/// The persisted key-to-digest mapping. `None` marks a key whose last
/// uploaded digest is unknown.
pub type HashRecords = BTreeMap<String, Option<String>>;

/// Loads, seeds, and atomically rewrites the state file.
pub struct HashStateStore {
    path: PathBuf,
}

impl HashStateStore {
    /// Create a state store persisting at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns true if the state file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted records.
    ///
    /// A missing file yields an empty map. An unparsable file is logged and
    /// also yields an empty map: corruption degrades to a full re-diff
    /// instead of failing the run.
    pub async fn load(&self) -> Result<HashRecords> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashRecords::new());
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file is corrupt, treating as empty"
                );
                Ok(HashRecords::new())
            }
        }
    }

    /// Build the initial state file from remote metadata.
    ///
    /// Invoked only when no state file exists. Every remote key passing the
    /// filter is recorded with the digest a previous run stored in its
    /// object metadata; objects without one get the unknown marker.
    pub async fn seed_from_remote(
        &self,
        store: &dyn ObjectStore,
        filter: &IncludeFilter,
    ) -> Result<()> {
        let keys = lister::list_all(store, filter).await?;

        let mut records = HashRecords::new();
        for key in keys {
            let metadata = store.head_metadata(&key).await?;
            let digest = metadata.get(HASH_METADATA_KEY).cloned();
            records.insert(key, digest);
        }

        self.save(&records).await
    }

    /// Atomically overwrite the state file with exactly the given records.
    ///
    /// Writes to a sibling temp file and renames it into place so an
    /// interrupted run never leaves a half-written state file behind.
    pub async fn save(&self, records: &HashRecords) -> Result<()> {
        let bytes = serde_json::to_vec(records)?;

        let temp_path = temp_sibling(&self.path);
        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

/// Temp file path next to `path`, so the rename stays on one filesystem.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// =============================================================================
// Tests
// =============================================================================
