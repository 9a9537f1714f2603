//! Local tree scanning and content hashing.
//!
//! Walks the configured root recursively and produces a
//! [`LocalFile`] per regular file: a slash-normalized key relative to the
//! root plus the streamed SHA-256 digest of its content. Any filesystem
//! error (including broken symlinks and permission failures) aborts the
//! scan; a partial tree is never silently synced.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::error::Result;
use crate::config::IncludeFilter;
use crate::util::CapacityManager;

/// Read buffer size for streamed hashing.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// A local file as seen by one scan: key plus current content digest.
///
/// Produced fresh every run and never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Root-relative path with `/` separators.
    pub key: String,
    /// Lower-case hex SHA-256 of the file content.
    pub digest: String,
}

/// Scan the tree under `root` and hash every regular file passing the
/// filter.
///
/// Traversal order is unspecified; callers must not rely on it. Hashing runs
/// concurrently, each file under one permit from the shared limiter to bound
/// open file handles.
pub async fn scan_local_files(
    root: &Path,
    filter: &IncludeFilter,
    limiter: &CapacityManager,
) -> Result<Vec<LocalFile>> {
    let mut pending: Vec<(String, PathBuf)> = Vec::new();
    collect_files(root, root, filter, limiter, &mut pending).await?;

    let tasks = pending.into_iter().map(|(key, path)| async move {
        let digest = hash_file(&path, limiter).await?;
        Ok::<LocalFile, super::SyncError>(LocalFile { key, digest })
    });

    let mut files = Vec::new();
    for result in join_all(tasks).await {
        files.push(result?);
    }
    Ok(files)
}

/// Compute the streamed SHA-256 digest of a file.
pub async fn hash_file(path: &Path, limiter: &CapacityManager) -> Result<String> {
    let _io = limiter.use_capacity(1).await;

    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Recursively collect `(key, path)` pairs for regular files under `dir`.
async fn collect_files(
    root: &Path,
    dir: &Path,
    filter: &IncludeFilter,
    limiter: &CapacityManager,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    let mut entries = {
        let _io = limiter.use_capacity(1).await;
        fs::read_dir(dir).await?
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;

        let (is_dir, is_file) = if file_type.is_symlink() {
            // Follow the link; a dangling target surfaces as an error here
            let metadata = fs::metadata(&path).await?;
            (metadata.is_dir(), metadata.is_file())
        } else {
            (file_type.is_dir(), file_type.is_file())
        };

        if is_dir {
            Box::pin(collect_files(root, &path, filter, limiter, out)).await?;
        } else if is_file {
            let key = relative_key(root, &path);
            if filter.matches(&key) {
                out.push((key, path));
            }
        }
    }

    Ok(())
}

/// Build a slash-normalized key for `path` relative to `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Tests
// =============================================================================
