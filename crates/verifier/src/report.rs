use chrono::{DateTime, Utc};
use serde::Serialize;

use reliquary_core::{Record, VerificationStatus};

/// Outcome of verifying one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordVerification {
    pub record_id: String,
    pub record_number: String,
    pub filename: String,
    pub status: VerificationStatus,
    /// Why the record failed or errored. `None` for verified records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Summary of a verification run.
///
/// `verified + failed + errors == total` always holds. A cancelled run also
/// reports the records it never reached in `skipped`.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Records the run processed.
    pub total: u64,
    pub verified: u64,
    pub failed: u64,
    pub errors: u64,
    /// Records never attempted because the run was cancelled.
    pub skipped: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-record outcomes, ordered by record number.
    pub records: Vec<RecordVerification>,
}

impl VerificationReport {
    /// Build a report from the outcomes of a run that selected `selected`
    /// records.
    pub(crate) fn tally(
        selected: u64,
        mut records: Vec<RecordVerification>,
        cancelled: bool,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        records.sort_by(|a, b| a.record_number.cmp(&b.record_number));

        let count = |status: VerificationStatus| {
            records.iter().filter(|r| r.status == status).count() as u64
        };
        let verified = count(VerificationStatus::Verified);
        let failed = count(VerificationStatus::Failed);
        let errors = count(VerificationStatus::Error);
        let total = verified + failed + errors;

        Self {
            total,
            verified,
            failed,
            errors,
            skipped: selected.saturating_sub(total),
            cancelled,
            started_at,
            finished_at,
            records,
        }
    }

    /// `true` when no record failed or errored.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    /// Records that did not verify, in record-number order.
    pub fn problems(&self) -> impl Iterator<Item = &RecordVerification> {
        self.records
            .iter()
            .filter(|r| r.status != VerificationStatus::Verified)
    }
}

/// A record removed by a disposal run.
#[derive(Debug, Clone, Serialize)]
pub struct DisposedRecord {
    pub record: Record,
    /// Whether the archived content was removed along with the record.
    pub content_deleted: bool,
}

/// A disposal candidate that could not be disposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisposalFailure {
    pub record_id: String,
    pub record_number: String,
    pub filename: String,
    pub reason: String,
}

/// Summary of a disposal run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisposalReport {
    pub disposed: Vec<DisposedRecord>,
    pub failures: Vec<DisposalFailure>,
    /// Expired records kept because they are under legal hold.
    pub held_expired: u64,
}

impl DisposalReport {
    /// Number of records disposed.
    pub fn count(&self) -> usize {
        self.disposed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: &str, status: VerificationStatus) -> RecordVerification {
        RecordVerification {
            record_id: format!("id-{number}"),
            record_number: number.into(),
            filename: format!("{number}.pdf"),
            status,
            detail: None,
        }
    }

    #[test]
    fn tally_counts_and_sorts() {
        let now = Utc::now();
        let report = VerificationReport::tally(
            4,
            vec![
                row("REC-3", VerificationStatus::Error),
                row("REC-1", VerificationStatus::Verified),
                row("REC-2", VerificationStatus::Failed),
            ],
            true,
            now,
            now,
        );

        assert_eq!(report.total, 3);
        assert_eq!(report.verified, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.is_clean());

        let numbers: Vec<_> = report.records.iter().map(|r| r.record_number.as_str()).collect();
        assert_eq!(numbers, ["REC-1", "REC-2", "REC-3"]);
        let problems: Vec<_> = report.problems().map(|r| r.record_number.as_str()).collect();
        assert_eq!(problems, ["REC-2", "REC-3"]);
    }

    #[test]
    fn empty_run_is_clean() {
        let now = Utc::now();
        let report = VerificationReport::tally(0, Vec::new(), false, now, now);
        assert!(report.is_clean());
        assert_eq!(report.skipped, 0);
    }
}
