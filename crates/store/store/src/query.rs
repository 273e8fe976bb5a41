use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reliquary_core::{Record, VerificationStatus};

/// Filters and pagination for listing active records.
///
/// Results are ordered by record number ascending so pages are stable
/// across calls.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RecordQuery {
    /// Filter by category.
    pub category: Option<String>,
    /// Filter by verification status.
    pub status: Option<VerificationStatus>,
    /// Filter by legal hold flag.
    pub legal_hold: Option<bool>,
    /// Only records whose retention expired at or before this time.
    pub expires_at_or_before: Option<DateTime<Utc>>,
    /// Maximum number of records to return (default 100, max 1000).
    pub limit: Option<u32>,
    /// Number of records to skip for pagination.
    pub offset: Option<u32>,
}

impl RecordQuery {
    /// Return the effective limit, clamped to 1..=1000, defaulting to 100.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }

    /// Return the effective offset, defaulting to 0.
    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Whether `record` passes every filter (pagination aside).
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(ref category) = self.category
            && record.category != *category
        {
            return false;
        }
        if let Some(status) = self.status
            && record.verification_status != status
        {
            return false;
        }
        if let Some(hold) = self.legal_hold
            && record.legal_hold != hold
        {
            return false;
        }
        if let Some(cutoff) = self.expires_at_or_before {
            match record.retention_expires_at {
                Some(at) if at <= cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// A paginated page of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPage {
    /// The records matching the query.
    pub records: Vec<Record>,
    /// Total number of records matching the query (before pagination).
    pub total: u64,
    /// The limit used for this page.
    pub limit: u32,
    /// The offset used for this page.
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use reliquary_core::{DigestAlgorithm, NewRecord};

    use super::*;

    fn record(category: &str, hold: bool, expires_in_days: i64) -> Record {
        let now = Utc::now();
        Record::ingested(
            NewRecord {
                storage_path: "a.pdf".into(),
                category: category.into(),
                legal_hold: hold,
                retention_expires_at: Some(now + Duration::days(expires_in_days)),
                ..NewRecord::default()
            },
            "h".into(),
            DigestAlgorithm::Sha256,
            now,
        )
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(RecordQuery::default().effective_limit(), 100);
        let q = RecordQuery {
            limit: Some(0),
            ..RecordQuery::default()
        };
        assert_eq!(q.effective_limit(), 1);
        let q = RecordQuery {
            limit: Some(50_000),
            ..RecordQuery::default()
        };
        assert_eq!(q.effective_limit(), 1000);
        assert_eq!(RecordQuery::default().effective_offset(), 0);
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(RecordQuery::default().matches(&record("contract", true, 10)));
    }

    #[test]
    fn filters_combine() {
        let q = RecordQuery {
            category: Some("contract".into()),
            legal_hold: Some(false),
            expires_at_or_before: Some(Utc::now()),
            ..RecordQuery::default()
        };

        assert!(q.matches(&record("contract", false, -1)));
        assert!(!q.matches(&record("invoice", false, -1)));
        assert!(!q.matches(&record("contract", true, -1)));
        assert!(!q.matches(&record("contract", false, 5)));
    }

    #[test]
    fn expiry_filter_excludes_indefinite_retention() {
        let mut r = record("contract", false, -1);
        r.retention_expires_at = None;
        let q = RecordQuery {
            expires_at_or_before: Some(Utc::now()),
            ..RecordQuery::default()
        };
        assert!(!q.matches(&r));
    }

    #[test]
    fn status_filter() {
        let mut r = record("contract", false, 1);
        r.verification_status = VerificationStatus::Failed;
        let q = RecordQuery {
            status: Some(VerificationStatus::Failed),
            ..RecordQuery::default()
        };
        assert!(q.matches(&r));
        r.verification_status = VerificationStatus::Verified;
        assert!(!q.matches(&r));
    }
}
