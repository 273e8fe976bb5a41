use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use reliquary_core::{ContentPolicy, DigestAlgorithm};
use reliquary_verifier::VerifierConfig;

/// Top-level configuration, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ReliquaryConfig {
    /// Record store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Content and verification settings.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl ReliquaryConfig {
    /// Load configuration from `path`, or use defaults if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(toml::from_str("")?)
        }
    }
}

/// Configuration for the record store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use: `"file"`, `"memory"`, or `"postgres"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Snapshot file for the `file` backend.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Connection URL for the `postgres` backend.
    pub url: Option<String>,
    /// Table prefix for the `postgres` backend.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            url: None,
            prefix: default_prefix(),
        }
    }
}

fn default_backend() -> String {
    "file".to_owned()
}

fn default_path() -> PathBuf {
    PathBuf::from("reliquary-archive.json")
}

fn default_prefix() -> String {
    "reliquary_".to_owned()
}

/// Configuration for content access and the verification engine.
#[derive(Debug, Deserialize)]
pub struct ArchiveConfig {
    /// Directory relative storage paths resolve against.
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,
    /// Digest algorithm for new ingestions.
    #[serde(default)]
    pub digest: DigestAlgorithm,
    /// What happens to content on disposal.
    #[serde(default)]
    pub content_policy: ContentPolicy,
    /// Records hashed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-record lock lifetime in seconds.
    #[serde(default = "default_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
    /// How long to wait for a per-record lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Retention applied at ingestion when none is given. `0` keeps such
    /// records indefinitely.
    #[serde(default = "default_retention_days")]
    pub default_retention_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            digest: DigestAlgorithm::default(),
            content_policy: ContentPolicy::default(),
            concurrency: default_concurrency(),
            lock_ttl_seconds: default_lock_ttl_seconds(),
            lock_timeout_ms: default_lock_timeout_ms(),
            default_retention_days: default_retention_days(),
        }
    }
}

impl ArchiveConfig {
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            concurrency: self.concurrency,
            lock_ttl: Duration::from_secs(self.lock_ttl_seconds),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            content_policy: self.content_policy,
            digest_algorithm: self.digest,
            default_retention: (self.default_retention_days > 0)
                .then(|| chrono::Duration::days(i64::from(self.default_retention_days))),
        }
    }
}

fn default_content_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_concurrency() -> usize {
    4
}

fn default_lock_ttl_seconds() -> u64 {
    300
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

fn default_retention_days() -> u32 {
    2555
}
