use std::time::Duration;

use reliquary_core::{ContentPolicy, DigestAlgorithm};

/// Tuning for an [`ArchiveVerifier`](crate::ArchiveVerifier).
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Records hashed in parallel during a verification run (default: 4).
    pub concurrency: usize,
    /// How long a per-record lock is held before it lapses (default: 300 seconds).
    pub lock_ttl: Duration,
    /// How long to wait for a per-record lock (default: 2 seconds).
    pub lock_timeout: Duration,
    /// What happens to content when its record is disposed (default: retain).
    pub content_policy: ContentPolicy,
    /// Algorithm used to hash newly ingested content (default: SHA-256).
    pub digest_algorithm: DigestAlgorithm,
    /// Retention applied at ingestion when none is given. `None` retains
    /// such records indefinitely (default: 2555 days).
    pub default_retention: Option<chrono::Duration>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            lock_ttl: Duration::from_secs(300),
            lock_timeout: Duration::from_secs(2),
            content_policy: ContentPolicy::Retain,
            digest_algorithm: DigestAlgorithm::Sha256,
            default_retention: Some(chrono::Duration::days(2555)),
        }
    }
}
