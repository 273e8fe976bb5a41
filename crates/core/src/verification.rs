use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Immutable audit entry for one verification attempt of one record.
///
/// Entries are append-only and reference their record by ID only, so the
/// trail survives the record's disposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHash {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// ID of the verified record.
    pub record_id: String,
    /// Record number at the time of verification.
    pub record_number: String,
    /// Digest computed during this attempt. `None` if the content could not
    /// be read or hashed.
    #[serde(default)]
    pub computed_hash: Option<String>,
    /// Digest captured at ingestion.
    pub expected_hash: String,
    /// Whether `computed_hash` equals `expected_hash`.
    pub matched: bool,
    /// When the attempt ran.
    pub verified_at: DateTime<Utc>,
    /// Actor that ran the verification (`"system"` or a user ID).
    pub verified_by: String,
    /// Failure description for attempts that could not compute a digest.
    #[serde(default)]
    pub error: Option<String>,
}

impl RecordHash {
    /// Entry for an attempt that produced a digest.
    pub fn computed(record: &Record, computed: String, actor: &str, now: DateTime<Utc>) -> Self {
        let matched = computed == record.original_hash;
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            record_id: record.id.clone(),
            record_number: record.record_number.clone(),
            computed_hash: Some(computed),
            expected_hash: record.original_hash.clone(),
            matched,
            verified_at: now,
            verified_by: actor.to_owned(),
            error: None,
        }
    }

    /// Entry for an attempt that failed before a digest could be produced.
    pub fn errored(record: &Record, error: impl Into<String>, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            record_id: record.id.clone(),
            record_number: record.record_number.clone(),
            computed_hash: None,
            expected_hash: record.original_hash.clone(),
            matched: false,
            verified_at: now,
            verified_by: actor.to_owned(),
            error: Some(error.into()),
        }
    }
}
