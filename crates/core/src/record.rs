use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::DigestAlgorithm;
use crate::retention::is_disposable;
use crate::status::VerificationStatus;

/// An archived file under a retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Human-readable record number (e.g. `REC-20260101-3fa2c1`).
    pub record_number: String,
    /// Original filename, for operator-facing summaries.
    pub filename: String,
    /// Location of the archived content, resolved by the content store.
    pub storage_path: String,
    /// Free-form category (e.g. `contract`, `model_release`, `invoice`).
    pub category: String,
    /// When the record was ingested.
    pub created_at: DateTime<Utc>,
    /// When `true` the record is never disposed, regardless of expiry.
    #[serde(default)]
    pub legal_hold: bool,
    /// End of the retention period. `None` retains the record indefinitely.
    #[serde(default)]
    pub retention_expires_at: Option<DateTime<Utc>>,
    /// Hex digest of the content captured at ingestion.
    pub original_hash: String,
    /// Algorithm that produced `original_hash`.
    #[serde(default)]
    pub digest_algorithm: DigestAlgorithm,
    /// Outcome of the most recent verification run.
    #[serde(default)]
    pub verification_status: VerificationStatus,
    /// When the content was last successfully hashed and compared.
    #[serde(default)]
    pub last_verified_at: Option<DateTime<Utc>>,
    /// Row version, bumped by the store on every mutation.
    #[serde(default)]
    pub version: u64,
}

impl Record {
    /// Build a freshly ingested record in `Pending` state.
    pub fn ingested(
        new: NewRecord,
        original_hash: String,
        digest_algorithm: DigestAlgorithm,
        now: DateTime<Utc>,
    ) -> Self {
        let id = uuid::Uuid::now_v7().to_string();
        let record_number = new
            .record_number
            .unwrap_or_else(|| generate_record_number(now));
        let filename = new
            .filename
            .unwrap_or_else(|| filename_from_path(&new.storage_path));

        Self {
            id,
            record_number,
            filename,
            storage_path: new.storage_path,
            category: new.category,
            created_at: now,
            legal_hold: new.legal_hold,
            retention_expires_at: new.retention_expires_at,
            original_hash,
            digest_algorithm,
            verification_status: VerificationStatus::Pending,
            last_verified_at: None,
            version: 0,
        }
    }

    /// Whether this record is eligible for disposal at `now`.
    pub fn is_disposable(&self, now: DateTime<Utc>) -> bool {
        is_disposable(self.legal_hold, self.retention_expires_at, now)
    }
}

/// Input for ingesting a new record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecord {
    /// Location of the content to archive.
    pub storage_path: String,
    /// Category label.
    pub category: String,
    /// Display filename. Defaults to the last path segment.
    #[serde(default)]
    pub filename: Option<String>,
    /// Explicit record number. Generated when absent.
    #[serde(default)]
    pub record_number: Option<String>,
    /// Place the record under legal hold immediately.
    #[serde(default)]
    pub legal_hold: bool,
    /// End of the retention period.
    #[serde(default)]
    pub retention_expires_at: Option<DateTime<Utc>>,
}

fn generate_record_number(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("REC-{}-{}", now.format("%Y%m%d"), &suffix[..6])
}

fn filename_from_path(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_owned()
}
