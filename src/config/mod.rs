//! Run configuration for bucketsync.
//!
//! The CLI layer parses and validates arguments into a [`SyncConfig`]; the
//! sync engine consumes the validated struct and never reads the environment
//! or defaults fields itself.

use std::path::PathBuf;

use regex::Regex;

/// Default number of concurrent in-flight hash/upload operations.
pub const DEFAULT_CONCURRENCY: u64 = 10;

// =============================================================================
// IncludeFilter
// =============================================================================

/// A precompiled key filter applied identically to local and remote
/// enumeration.
///
/// With no pattern, every key is accepted. With a pattern, only keys the
/// regex matches are visible to the sync: excluded keys are neither uploaded
/// nor eligible for purge.
#[derive(Debug, Clone, Default)]
pub struct IncludeFilter {
    pattern: Option<Regex>,
}

impl IncludeFilter {
    /// Create a filter that accepts every key.
    pub fn accept_all() -> Self {
        Self { pattern: None }
    }

    /// Compile an include pattern into a filter.
    pub fn from_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Some(Regex::new(pattern)?),
        })
    }

    /// Returns true if the key passes the filter.
    pub fn matches(&self, key: &str) -> bool {
        match &self.pattern {
            Some(regex) => regex.is_match(key),
            None => true,
        }
    }
}

// =============================================================================
// SyncConfig
// =============================================================================

/// Validated configuration for a single sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target bucket name.
    pub bucket: String,
    /// Store region.
    pub region: String,
    /// Optional custom endpoint URL (for LocalStack/MinIO and S3-compatible
    /// stores).
    pub endpoint_url: Option<String>,
    /// Address the bucket with path-style URLs instead of virtual hosting.
    pub force_path_style: bool,
    /// Optional static access key. When absent the SDK credential chain is
    /// used (env vars, ~/.aws, IAM roles, etc.).
    pub access_key_id: Option<String>,
    /// Optional static secret key, paired with `access_key_id`.
    pub secret_access_key: Option<String>,
    /// Root of the local tree to publish.
    pub directory: PathBuf,
    /// Path of the persisted key-to-digest state file.
    pub state_file: PathBuf,
    /// Key filter shared by local and remote enumeration.
    pub include: IncludeFilter,
    /// Delete remote objects that no longer exist locally.
    pub purge: bool,
    /// Shared limit on concurrent hash and upload operations.
    pub concurrency: u64,
}

impl SyncConfig {
    /// Create a config with defaults for everything but the bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "eu-central-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            directory: PathBuf::from("."),
            state_file: PathBuf::from("s3-hashes.json"),
            include: IncludeFilter::accept_all(),
            purge: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the local root directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the state file path.
    pub fn with_state_file(mut self, state_file: impl Into<PathBuf>) -> Self {
        self.state_file = state_file.into();
        self
    }

    /// Set the include filter.
    pub fn with_include(mut self, include: IncludeFilter) -> Self {
        self.include = include;
        self
    }

    /// Enable or disable purging of stale remote objects.
    pub fn with_purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all_matches_everything() {
        let filter = IncludeFilter::accept_all();
        assert!(filter.matches("index.html"));
        assert!(filter.matches("assets/app.js"));
        assert!(filter.matches(""));
    }

    #[test]
    fn test_pattern_filter() {
        let filter = IncludeFilter::from_pattern(r"\.html$").unwrap();
        assert!(filter.matches("index.html"));
        assert!(filter.matches("docs/guide.html"));
        assert!(!filter.matches("styles.css"));
        assert!(!filter.matches("html/readme.txt"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(IncludeFilter::from_pattern("(unclosed").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = SyncConfig::new("my-bucket");
        assert_eq!(config.bucket, "my-bucket");
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.state_file, PathBuf::from("s3-hashes.json"));
        assert!(!config.purge);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }
}
