//! Command-line interface for bucketsync.
//!
//! Argument parsing and validation live here; the engine only ever sees the
//! resulting [`SyncConfig`].

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_CONCURRENCY, IncludeFilter, SyncConfig};
use crate::store::S3ObjectStore;
use crate::sync::{SyncError, run_sync};

/// Default state file name, also used for the relocation rule below.
const DEFAULT_STATE_FILE: &str = "s3-hashes.json";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// The include pattern did not compile.
    #[error("invalid include pattern '{pattern}': {source}")]
    InvalidInclude {
        pattern: String,
        source: regex::Error,
    },

    /// The sync directory does not exist or is not a directory.
    #[error("not a directory: {0}")]
    InvalidDirectory(PathBuf),

    /// The sync run failed.
    #[error("{0}")]
    Sync(#[from] SyncError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// Publish a local directory tree to an S3-compatible object store.
#[derive(Parser, Debug)]
#[command(name = "bucketsync", version, about, long_about = None)]
pub struct Cli {
    /// Target bucket name.
    #[arg(short = 'b', long)]
    pub bucket: String,

    /// Store region.
    #[arg(short = 'r', long, default_value = "eu-central-1")]
    pub region: String,

    /// Custom endpoint URL (for S3-compatible stores).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing instead of virtual hosting.
    #[arg(long)]
    pub force_path_style: bool,

    /// Static access key ID. Falls back to the SDK credential chain.
    #[arg(short = 'k', long)]
    pub access_key_id: Option<String>,

    /// Static secret access key, paired with --access-key-id.
    #[arg(short = 's', long)]
    pub secret_access_key: Option<String>,

    /// Directory to sync.
    #[arg(short = 'd', long, default_value = ".")]
    pub directory: PathBuf,

    /// File containing the key-to-digest cache.
    #[arg(long = "hash-file", default_value = DEFAULT_STATE_FILE)]
    pub hash_file: PathBuf,

    /// Only sync keys matching this regular expression.
    #[arg(short = 'i', long)]
    pub include: Option<String>,

    /// Delete remote objects that no longer exist locally.
    #[arg(short = 'p', long)]
    pub purge: bool,

    /// Maximum concurrent hash/upload operations.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: u64,
}

impl Cli {
    /// Validate the arguments into a [`SyncConfig`].
    pub fn into_config(self) -> Result<SyncConfig> {
        if !self.directory.is_dir() {
            return Err(CliError::InvalidDirectory(self.directory));
        }

        let include = match &self.include {
            Some(pattern) => IncludeFilter::from_pattern(pattern).map_err(|source| {
                CliError::InvalidInclude {
                    pattern: pattern.clone(),
                    source,
                }
            })?,
            None => IncludeFilter::accept_all(),
        };

        // With both defaults in place the state file would land inside the
        // synced tree and be uploaded on the next run; keep it one level up.
        let hash_file = if self.directory == PathBuf::from(".")
            && self.hash_file == PathBuf::from(DEFAULT_STATE_FILE)
        {
            PathBuf::from("..").join(DEFAULT_STATE_FILE)
        } else {
            self.hash_file
        };

        Ok(SyncConfig {
            bucket: self.bucket,
            region: self.region,
            endpoint_url: self.endpoint,
            force_path_style: self.force_path_style,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            directory: self.directory,
            state_file: hash_file,
            include,
            purge: self.purge,
            concurrency: self.concurrency,
        })
    }
}

// =============================================================================
// CLI Execution
// =============================================================================

/// Parse arguments, run one sync, and report the outcome.
pub async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Sync(SyncError::Store(err))) => {
            eprintln!("There was a problem talking to the object store: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Syncing failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    let store = S3ObjectStore::new(&config).await;
    let report = run_sync(&store, &config).await?;

    tracing::info!(
        uploaded = report.uploaded,
        unchanged = report.unchanged,
        deleted = report.deleted,
        "sync complete"
    );
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args(dir: &str) -> Vec<String> {
        vec![
            "bucketsync".into(),
            "--bucket".into(),
            "my-bucket".into(),
            "--directory".into(),
            dir.into(),
        ]
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(base_args(&dir.path().to_string_lossy()));

        let config = cli.into_config().unwrap();
        assert_eq!(config.region, "eu-central-1");
        assert!(!config.purge);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
    }

    #[test]
    fn test_default_hash_file_relocates_for_default_directory() {
        let mut args = base_args(".");
        args.truncate(3); // drop --directory, keep the "." default
        let cli = Cli::parse_from(args);

        let config = cli.into_config().unwrap();
        assert_eq!(config.state_file, PathBuf::from("..").join(DEFAULT_STATE_FILE));
    }

    #[test]
    fn test_invalid_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = base_args(&dir.path().to_string_lossy());
        args.extend(["--include".into(), "(unclosed".into()]);
        let cli = Cli::parse_from(args);

        assert!(matches!(
            cli.into_config(),
            Err(CliError::InvalidInclude { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let cli = Cli::parse_from(base_args(&missing.to_string_lossy()));

        assert!(matches!(
            cli.into_config(),
            Err(CliError::InvalidDirectory(_))
        ));
    }
}
