use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Whether a record with the given hold flag and expiry may be disposed at `now`.
///
/// Legal hold takes absolute precedence: a held record is never disposable,
/// however long ago it expired. Records without an expiry are retained
/// indefinitely.
pub fn is_disposable(
    legal_hold: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if legal_hold {
        return false;
    }
    expires_at.is_some_and(|at| at <= now)
}

/// What happens to archived content when its record is disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentPolicy {
    /// Remove the record only; leave the content in place.
    #[default]
    Retain,
    /// Remove the record and delete the content from the content store.
    Delete,
}

impl fmt::Display for ContentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => f.write_str("retain"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Append-only audit entry written for every disposed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposalEntry {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// ID of the disposed record.
    pub record_id: String,
    /// Record number at the time of disposal.
    pub record_number: String,
    /// Filename at the time of disposal.
    pub filename: String,
    /// Category at the time of disposal.
    pub category: String,
    /// Content location at the time of disposal.
    pub storage_path: String,
    /// When the record was disposed.
    pub disposed_at: DateTime<Utc>,
    /// Actor that ran the disposal.
    pub disposed_by: String,
    /// Whether the underlying content was deleted as well.
    #[serde(default)]
    pub content_deleted: bool,
}

impl DisposalEntry {
    /// Build the audit entry for disposing `record`.
    pub fn for_record(record: &Record, actor: &str, now: DateTime<Utc>, content_deleted: bool) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            record_id: record.id.clone(),
            record_number: record.record_number.clone(),
            filename: record.filename.clone(),
            category: record.category.clone(),
            storage_path: record.storage_path.clone(),
            disposed_at: now,
            disposed_by: actor.to_owned(),
            content_deleted,
        }
    }
}
