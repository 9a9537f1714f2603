//! Run sync orchestration.
//!
//! One invocation is one run: seed state if none exists, load it, scan and
//! diff, upload, rewrite the state file, then purge if enabled. The state
//! file is only rewritten after every upload succeeded, so an aborted run
//! leaves it exactly as it was and the next invocation re-diffs correctly.

use super::differ;
use super::error::Result;
use super::lister;
use super::purger;
use super::scan;
use super::state::{HashRecords, HashStateStore};
use super::uploader;
use crate::config::SyncConfig;
use crate::store::ObjectStore;
use crate::util::CapacityManager;

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files uploaded because they were new, changed, or of unknown digest.
    pub uploaded: usize,
    /// Files whose recorded digest already matched.
    pub unchanged: usize,
    /// Remote objects deleted by the purge phase.
    pub deleted: usize,
}

/// Execute one sync run against the given store.
pub async fn run_sync(store: &dyn ObjectStore, config: &SyncConfig) -> Result<SyncReport> {
    let limiter = CapacityManager::new(config.concurrency);
    let state = HashStateStore::new(&config.state_file);

    if !state.exists() {
        tracing::info!(
            state_file = %config.state_file.display(),
            "no state file, seeding from remote metadata"
        );
        state.seed_from_remote(store, &config.include).await?;
    }

    let records = state.load().await?;

    let local_files = scan::scan_local_files(&config.directory, &config.include, &limiter).await?;
    let plan = differ::plan(&local_files, &records);
    let uploaded = plan.to_upload.len();

    uploader::upload_files(store, &config.directory, &plan.to_upload, &limiter).await?;

    // Rewrite the state from the full local listing: stale keys drop out,
    // unchanged keys keep their digests current.
    let new_records: HashRecords = local_files
        .iter()
        .map(|file| (file.key.clone(), Some(file.digest.clone())))
        .collect();
    state.save(&new_records).await?;

    let deleted = if config.purge {
        let remote_keys = lister::list_all(store, &config.include).await?;
        purger::purge(store, &remote_keys, &plan.keys_to_keep).await?
    } else {
        0
    };

    Ok(SyncReport {
        uploaded,
        unchanged: local_files.len() - uploaded,
        deleted,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IncludeFilter;
    use crate::store::MemoryObjectStore;

    fn config_for(dir: &tempfile::TempDir, state_dir: &tempfile::TempDir) -> SyncConfig {
        SyncConfig::new("test-bucket")
            .with_directory(dir.path())
            .with_state_file(state_dir.path().join("hashes.json"))
    }

    fn write_file(dir: &tempfile::TempDir, key: &str, content: &str) {
        let path = dir.path().join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_first_run_uploads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "index.html", "<html></html>");
        write_file(&dir, "assets/app.js", "console.log(1)");

        let store = MemoryObjectStore::new();
        let report = run_sync(&store, &config_for(&dir, &state_dir)).await.unwrap();

        assert_eq!(report.uploaded, 2);
        assert_eq!(report.unchanged, 0);
        assert_eq!(store.put_records().len(), 2);
        assert_eq!(store.keys(), vec!["assets/app.js", "index.html"]);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "index.html", "<html></html>");
        write_file(&dir, "style.css", "body{}");

        let store = MemoryObjectStore::new();
        let config = config_for(&dir, &state_dir).with_purge(true);

        run_sync(&store, &config).await.unwrap();
        let puts_after_first = store.put_records().len();
        let deletes_after_first = store.delete_calls().len();

        let report = run_sync(&store, &config).await.unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.put_records().len(), puts_after_first);
        assert_eq!(store.delete_calls().len(), deletes_after_first);
    }

    #[tokio::test]
    async fn test_changed_file_is_reuploaded() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "page.html", "v1");

        let store = MemoryObjectStore::new();
        let config = config_for(&dir, &state_dir);

        run_sync(&store, &config).await.unwrap();
        write_file(&dir, "page.html", "v2");
        let report = run_sync(&store, &config).await.unwrap();

        assert_eq!(report.uploaded, 1);
        assert_eq!(store.put_records().len(), 2);
    }

    #[tokio::test]
    async fn test_digest_round_trip_into_state() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let content = "some content";
        write_file(&dir, "a.txt", content);

        let store = MemoryObjectStore::new();
        let config = config_for(&dir, &state_dir);
        run_sync(&store, &config).await.unwrap();

        let records = HashStateStore::new(&config.state_file).load().await.unwrap();
        let recorded = records["a.txt"].clone().unwrap();

        use sha2::{Digest, Sha256};
        let recomputed = format!("{:x}", Sha256::digest(content.as_bytes()));
        assert_eq!(recorded, recomputed);

        // And the same digest was tagged onto the uploaded object
        assert_eq!(store.put_records()[0].digest, recomputed);
    }

    #[tokio::test]
    async fn test_purge_removes_only_stale_keys() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.txt", "a");
        write_file(&dir, "b.txt", "b");

        let store = MemoryObjectStore::new();
        store.insert_object("stale.txt", Some("whatever"));

        let config = config_for(&dir, &state_dir).with_purge(true);
        let report = run_sync(&store, &config).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(store.delete_calls(), vec![vec!["stale.txt".to_string()]]);
        assert_eq!(store.keys(), vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_include_filter_limits_uploads_and_purges() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.txt", "a");
        write_file(&dir, "b.html", "b");

        let store = MemoryObjectStore::new();
        // a.txt is absent locally-filtered and absent remotely-filtered:
        // it must never become a delete candidate
        store.insert_object("a.txt", Some("remote-digest"));

        let config = config_for(&dir, &state_dir)
            .with_include(IncludeFilter::from_pattern(r"\.html$").unwrap())
            .with_purge(true);
        let report = run_sync(&store, &config).await.unwrap();

        assert_eq!(report.uploaded, 1);
        assert_eq!(store.put_records().len(), 1);
        assert_eq!(store.put_records()[0].key, "b.html");
        assert_eq!(report.deleted, 0);
        assert!(store.delete_calls().is_empty());
        assert!(store.keys().contains(&"a.txt".to_string()));
    }

    #[tokio::test]
    async fn test_seeding_skips_reupload_of_matching_remote_digest() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let content = "already uploaded";
        write_file(&dir, "same.txt", content);

        use sha2::{Digest, Sha256};
        let digest = format!("{:x}", Sha256::digest(content.as_bytes()));

        let store = MemoryObjectStore::new();
        store.insert_object("same.txt", Some(&digest));

        // No state file yet: the run seeds from remote metadata first
        let report = run_sync(&store, &config_for(&dir, &state_dir)).await.unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(report.unchanged, 1);
        assert!(store.put_records().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_unknown_digest_forces_upload() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "mystery.bin", "content");

        let store = MemoryObjectStore::new();
        // Remote object exists but carries no digest metadata
        store.insert_object("mystery.bin", None);

        let report = run_sync(&store, &config_for(&dir, &state_dir)).await.unwrap();

        assert_eq!(report.uploaded, 1);
        assert_eq!(store.put_records().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_state_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "ok.txt", "ok");

        let store = MemoryObjectStore::new();
        let config = config_for(&dir, &state_dir);
        run_sync(&store, &config).await.unwrap();
        let state_before = std::fs::read_to_string(&config.state_file).unwrap();

        write_file(&dir, "ok.txt", "changed");
        write_file(&dir, "bad.txt", "bad");
        store.fail_put_for("bad.txt");

        let result = run_sync(&store, &config).await;
        assert!(result.is_err());

        let state_after = std::fs::read_to_string(&config.state_file).unwrap();
        assert_eq!(state_before, state_after);
    }

    #[tokio::test]
    async fn test_corrupt_state_triggers_full_reupload() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.txt", "a");

        let config = config_for(&dir, &state_dir);
        std::fs::write(&config.state_file, b"garbage").unwrap();

        let store = MemoryObjectStore::new();
        let report = run_sync(&store, &config).await.unwrap();

        assert_eq!(report.uploaded, 1);
        // The rewritten state file is valid again
        let records = HashStateStore::new(&config.state_file).load().await.unwrap();
        assert!(records["a.txt"].is_some());
    }
}
