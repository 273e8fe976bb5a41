use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::status::VerificationStatus;

/// Aggregate view over the active records of an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStats {
    /// Number of active records.
    pub total: u64,
    /// Record count per category.
    pub by_category: BTreeMap<String, u64>,
    /// Record count per verification status. Every status is present, zero
    /// counts included.
    pub by_status: BTreeMap<VerificationStatus, u64>,
    /// Records currently under legal hold.
    pub with_legal_hold: u64,
    /// Records currently eligible for disposal.
    pub expired: u64,
}

impl RecordStats {
    /// Aggregate `records` as of `now`.
    pub fn collect<'a>(records: impl IntoIterator<Item = &'a Record>, now: DateTime<Utc>) -> Self {
        let mut stats = Self {
            by_status: VerificationStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            ..Self::default()
        };

        for record in records {
            stats.total += 1;
            *stats.by_category.entry(record.category.clone()).or_default() += 1;
            *stats.by_status.entry(record.verification_status).or_default() += 1;
            if record.legal_hold {
                stats.with_legal_hold += 1;
            }
            if record.is_disposable(now) {
                stats.expired += 1;
            }
        }

        stats
    }
}
