use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use reliquary_core::{
    ContentPolicy, DisposalEntry, Record, RecordHash, RecordStats, VerificationStatus,
};
use reliquary_store::{RecordLease, RecordLock, RecordQuery, RecordStore, StoreError};

use crate::builder::ArchiveVerifierBuilder;
use crate::clock::Clock;
use crate::config::VerifierConfig;
use crate::content::ContentStore;
use crate::error::VerifierError;
use crate::report::{
    DisposalFailure, DisposalReport, DisposedRecord, RecordVerification, VerificationReport,
};

/// Verifies archived content against its ingestion digest and disposes of
/// records whose retention has lapsed.
///
/// Every record is handled under its own [`RecordLock`] so a verification
/// and a disposal of the same record never interleave. Problems with a
/// single record are reported, never propagated: only a failing store
/// aborts a run.
pub struct ArchiveVerifier {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) content: Arc<dyn ContentStore>,
    pub(crate) lock: Arc<dyn RecordLock>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: VerifierConfig,
}

/// Per-record result of a disposal attempt.
enum DisposalOutcome {
    Disposed(DisposedRecord),
    /// A legal hold was placed after the record was selected.
    Spared,
    Failed(String),
}

impl ArchiveVerifier {
    pub fn builder() -> ArchiveVerifierBuilder {
        ArchiveVerifierBuilder::new()
    }

    /// Verify every active record. See [`Self::verify_all_records_until`].
    pub async fn verify_all_records(
        &self,
        actor: &str,
    ) -> Result<VerificationReport, VerifierError> {
        self.verify_all_records_until(actor, &CancellationToken::new())
            .await
    }

    /// Re-hash every active record and compare it with the digest captured
    /// at ingestion.
    ///
    /// Each record ends the run as `VERIFIED`, `FAILED` (content changed) or
    /// `ERROR` (content unreadable), and every attempt appends a
    /// [`RecordHash`] entry. Once `cancel` fires, in-flight records finish and
    /// the rest are counted as skipped.
    #[instrument(skip(self, cancel))]
    pub async fn verify_all_records_until(
        &self,
        actor: &str,
        cancel: &CancellationToken,
    ) -> Result<VerificationReport, VerifierError> {
        let started_at = self.clock.now();
        let records = self.store.list_active().await?;
        let selected = records.len() as u64;
        info!(records = selected, "verification run started");

        // Stops scheduling new records after a store failure.
        let abort = cancel.child_token();
        let outcomes: Vec<Option<Result<RecordVerification, VerifierError>>> =
            futures::stream::iter(records)
                .map(|record| {
                    let abort = &abort;
                    async move {
                        if abort.is_cancelled() {
                            return None;
                        }
                        let outcome = self.verify_one(record, actor).await;
                        if matches!(&outcome, Err(e) if e.is_systemic()) {
                            abort.cancel();
                        }
                        Some(outcome)
                    }
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut rows = Vec::with_capacity(outcomes.len());
        for outcome in outcomes.into_iter().flatten() {
            rows.push(outcome?);
        }

        let report = VerificationReport::tally(
            selected,
            rows,
            cancel.is_cancelled(),
            started_at,
            self.clock.now(),
        );
        info!(
            total = report.total,
            verified = report.verified,
            failed = report.failed,
            errors = report.errors,
            skipped = report.skipped,
            "verification run complete"
        );
        Ok(report)
    }

    async fn verify_one(
        &self,
        record: Record,
        actor: &str,
    ) -> Result<RecordVerification, VerifierError> {
        let lease = match self.lock_record(&record.id, actor).await {
            Ok(lease) => lease,
            Err(e) if e.is_systemic() => return Err(e.into()),
            Err(e) => {
                let detail = e.to_string();
                warn!(record_number = %record.record_number, error = %e, "skipping locked record");
                let entry = RecordHash::errored(&record, &detail, actor, self.clock.now());
                self.append_hash(entry).await?;
                return Ok(row(&record, VerificationStatus::Error, Some(detail)));
            }
        };

        let outcome = self.verify_locked(record, actor).await;
        self.release(&lease).await;
        outcome
    }

    async fn verify_locked(
        &self,
        record: Record,
        actor: &str,
    ) -> Result<RecordVerification, VerifierError> {
        // Re-read under the lock: the listed copy may be stale.
        let Some(current) = self.store.get_record(&record.id).await? else {
            let detail = "record was disposed during verification".to_owned();
            warn!(record_number = %record.record_number, "{detail}");
            let entry = RecordHash::errored(&record, &detail, actor, self.clock.now());
            self.append_hash(entry).await?;
            return Ok(row(&record, VerificationStatus::Error, Some(detail)));
        };

        let digest = self
            .content
            .digest(&current.storage_path, current.digest_algorithm)
            .await;
        let now = self.clock.now();

        let (status, entry, detail) = match digest {
            Ok(computed) => {
                let entry = RecordHash::computed(&current, computed, actor, now);
                if entry.matched {
                    debug!(record_number = %current.record_number, "content verified");
                    (VerificationStatus::Verified, entry, None)
                } else {
                    warn!(
                        record_number = %current.record_number,
                        filename = %current.filename,
                        expected = %entry.expected_hash,
                        computed = entry.computed_hash.as_deref().unwrap_or_default(),
                        "content hash mismatch, record may have been tampered with"
                    );
                    let detail = format!(
                        "expected {} but computed {}",
                        entry.expected_hash,
                        entry.computed_hash.as_deref().unwrap_or_default()
                    );
                    (VerificationStatus::Failed, entry, Some(detail))
                }
            }
            Err(e) => {
                warn!(
                    record_number = %current.record_number,
                    filename = %current.filename,
                    error = %e,
                    "content could not be hashed"
                );
                let detail = e.to_string();
                let entry = RecordHash::errored(&current, &detail, actor, now);
                (VerificationStatus::Error, entry, Some(detail))
            }
        };

        // An unreadable record keeps its last successful verification time.
        let verified_at = (status != VerificationStatus::Error).then_some(now);
        match self
            .store
            .update_verification(&current.id, current.version, status, verified_at)
            .await
        {
            Ok(_) => {
                self.append_hash(entry).await?;
                Ok(row(&current, status, detail))
            }
            Err(e) if e.is_systemic() => Err(e.into()),
            Err(e) => {
                let detail = format!("could not record outcome: {e}");
                warn!(record_number = %current.record_number, error = %e, "{detail}");
                let entry = RecordHash::errored(&current, &detail, actor, now);
                self.append_hash(entry).await?;
                Ok(row(&current, VerificationStatus::Error, Some(detail)))
            }
        }
    }

    async fn append_hash(&self, entry: RecordHash) -> Result<(), VerifierError> {
        match self.store.append_hash(entry).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_systemic() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "failed to append verification entry");
                Ok(())
            }
        }
    }

    /// Dispose of every record whose retention has lapsed and that is not
    /// under legal hold.
    ///
    /// Legal hold always wins, whatever the expiry. Each candidate is
    /// re-checked under its lock before removal, and a record that cannot be
    /// disposed is reported and skipped.
    #[instrument(skip(self))]
    pub async fn dispose_expired_records(
        &self,
        actor: &str,
    ) -> Result<DisposalReport, VerifierError> {
        let now = self.clock.now();
        let expired = self
            .store
            .list_matching(RecordQuery {
                expires_at_or_before: Some(now),
                ..RecordQuery::default()
            })
            .await?;

        let mut report = DisposalReport::default();
        for record in expired {
            if !record.is_disposable(now) {
                if record.legal_hold {
                    debug!(record_number = %record.record_number, "expired record under legal hold");
                    report.held_expired += 1;
                }
                continue;
            }

            match self.dispose_one(&record, actor, now).await? {
                DisposalOutcome::Disposed(disposed) => report.disposed.push(disposed),
                DisposalOutcome::Spared => report.held_expired += 1,
                DisposalOutcome::Failed(reason) => {
                    warn!(record_number = %record.record_number, %reason, "record not disposed");
                    report.failures.push(DisposalFailure {
                        record_id: record.id.clone(),
                        record_number: record.record_number.clone(),
                        filename: record.filename.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            disposed = report.disposed.len(),
            failed = report.failures.len(),
            held = report.held_expired,
            "disposal run complete"
        );
        Ok(report)
    }

    async fn dispose_one(
        &self,
        record: &Record,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<DisposalOutcome, VerifierError> {
        let lease = match self.lock_record(&record.id, actor).await {
            Ok(lease) => lease,
            Err(e) if e.is_systemic() => return Err(e.into()),
            Err(e) => return Ok(DisposalOutcome::Failed(e.to_string())),
        };

        let outcome = self.dispose_locked(record, actor, now).await;
        self.release(&lease).await;
        outcome
    }

    async fn dispose_locked(
        &self,
        record: &Record,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<DisposalOutcome, VerifierError> {
        let Some(current) = self.store.get_record(&record.id).await? else {
            return Ok(DisposalOutcome::Failed("record no longer exists".into()));
        };
        if !current.is_disposable(now) {
            info!(
                record_number = %current.record_number,
                legal_hold = current.legal_hold,
                "record no longer disposable, sparing it"
            );
            return Ok(DisposalOutcome::Spared);
        }

        // Content goes first: a failed removal leaves the record intact.
        let content_deleted = match self.config.content_policy {
            ContentPolicy::Retain => false,
            ContentPolicy::Delete => match self.content.delete(&current.storage_path).await {
                Ok(()) => true,
                Err(e) => {
                    return Ok(DisposalOutcome::Failed(format!(
                        "content could not be deleted: {e}"
                    )));
                }
            },
        };

        let entry = DisposalEntry::for_record(&current, actor, now, content_deleted);
        match self
            .store
            .dispose_record(&current.id, current.version, entry)
            .await
        {
            Ok(disposed) => {
                info!(
                    record_number = %disposed.record_number,
                    filename = %disposed.filename,
                    category = %disposed.category,
                    content_deleted,
                    "record disposed"
                );
                Ok(DisposalOutcome::Disposed(DisposedRecord {
                    record: disposed,
                    content_deleted,
                }))
            }
            Err(e) if e.is_systemic() => Err(e.into()),
            Err(e) => {
                let reason = if content_deleted {
                    format!("content deleted but record removal failed: {e}")
                } else {
                    format!("record removal failed: {e}")
                };
                Ok(DisposalOutcome::Failed(reason))
            }
        }
    }

    /// Counts of active records by category and verification status.
    #[instrument(skip(self))]
    pub async fn get_record_stats(&self) -> Result<RecordStats, VerifierError> {
        let records = self.store.list_active().await?;
        Ok(RecordStats::collect(&records, self.clock.now()))
    }

    pub(crate) async fn lock_record(
        &self,
        id: &str,
        actor: &str,
    ) -> Result<RecordLease, StoreError> {
        self.lock
            .lock(id, actor, self.config.lock_ttl, self.config.lock_timeout)
            .await
    }

    pub(crate) async fn release(&self, lease: &RecordLease) {
        if let Err(e) = self.lock.unlock(lease).await {
            warn!(record_id = %lease.record_id, error = %e, "failed to release record lease");
        }
    }
}

fn row(record: &Record, status: VerificationStatus, detail: Option<String>) -> RecordVerification {
    RecordVerification {
        record_id: record.id.clone(),
        record_number: record.record_number.clone(),
        filename: record.filename.clone(),
        status,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use reliquary_core::{DigestAlgorithm, NewRecord};
    use reliquary_store::RecordPage;
    use reliquary_store_memory::{MemoryRecordLock, MemoryRecordStore};

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::content::MemoryContentStore;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryRecordStore>,
        content: Arc<MemoryContentStore>,
        clock: Arc<ManualClock>,
        lock: Arc<MemoryRecordLock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryRecordStore::new()),
                content: Arc::new(MemoryContentStore::new()),
                clock: Arc::new(ManualClock::new(at(10))),
                lock: Arc::new(MemoryRecordLock::new()),
            }
        }

        fn verifier(&self, config: VerifierConfig) -> ArchiveVerifier {
            ArchiveVerifier::builder()
                .store(self.store.clone())
                .content(self.content.clone())
                .lock(self.lock.clone())
                .clock(self.clock.clone())
                .config(config)
                .build()
                .unwrap()
        }

        async fn archive(&self, number: &str, bytes: &str, expires: Option<DateTime<Utc>>) -> Record {
            let path = format!("archive/{number}.pdf");
            self.content.put(path.clone(), bytes);
            let record = Record::ingested(
                NewRecord {
                    storage_path: path,
                    category: "contract".into(),
                    record_number: Some(number.into()),
                    retention_expires_at: expires,
                    ..NewRecord::default()
                },
                DigestAlgorithm::Sha256.digest(bytes.as_bytes()),
                DigestAlgorithm::Sha256,
                at(1),
            );
            self.store.insert_record(record).await.unwrap()
        }
    }

    #[tokio::test]
    async fn verify_classifies_each_record() {
        let fx = Fixture::new();
        fx.archive("REC-A", "intact", None).await;
        let tampered = fx.archive("REC-B", "original", None).await;
        let missing = fx.archive("REC-C", "lost", None).await;
        fx.content.put(tampered.storage_path.clone(), "altered");
        fx.content.remove(&missing.storage_path);

        let report = fx
            .verifier(VerifierConfig::default())
            .verify_all_records("auditor")
            .await
            .unwrap();

        assert_eq!(
            (report.total, report.verified, report.failed, report.errors),
            (3, 1, 1, 1)
        );
        let statuses: Vec<_> = report.records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                VerificationStatus::Verified,
                VerificationStatus::Failed,
                VerificationStatus::Error
            ]
        );

        let b = fx.store.get_by_number("REC-B").await.unwrap().unwrap();
        assert_eq!(b.verification_status, VerificationStatus::Failed);
        assert_eq!(b.last_verified_at, Some(at(10)));

        let c = fx.store.get_by_number("REC-C").await.unwrap().unwrap();
        assert_eq!(c.verification_status, VerificationStatus::Error);
        assert_eq!(c.last_verified_at, None);

        let trail = fx.store.hashes_for(&tampered.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert!(!trail[0].matched);
        assert_eq!(trail[0].expected_hash, tampered.original_hash);
        assert_eq!(
            trail[0].computed_hash.as_deref(),
            Some(DigestAlgorithm::Sha256.digest(b"altered").as_str())
        );
        assert_ne!(trail[0].computed_hash.as_deref(), Some(trail[0].expected_hash.as_str()));
        assert_eq!(trail[0].error, None);

        let trail = fx.store.hashes_for(&missing.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert!(!trail[0].matched);
        assert!(trail[0].error.as_deref().unwrap().contains("not found"));
        assert_eq!(trail[0].verified_by, "auditor");
    }

    #[tokio::test]
    async fn unreadable_content_is_an_error_not_a_failure() {
        let fx = Fixture::new();
        let record = fx.archive("REC-A", "bytes", None).await;
        fx.content.set_unreadable(record.storage_path.clone());

        let report = fx
            .verifier(VerifierConfig::default())
            .verify_all_records("auditor")
            .await
            .unwrap();
        assert_eq!(report.errors, 1);
        assert_eq!(report.failed, 0);
        assert!(report.records[0].detail.as_deref().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn reverification_restores_verified_status() {
        let fx = Fixture::new();
        let record = fx.archive("REC-A", "bytes", None).await;
        let verifier = fx.verifier(VerifierConfig::default());

        fx.content.remove(&record.storage_path);
        verifier.verify_all_records("auditor").await.unwrap();

        fx.content.put(record.storage_path.clone(), "bytes");
        fx.clock.advance(chrono::Duration::days(1));
        let report = verifier.verify_all_records("auditor").await.unwrap();
        assert!(report.is_clean());

        let stored = fx.store.get_record(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.verification_status, VerificationStatus::Verified);
        assert_eq!(stored.last_verified_at, Some(at(11)));
        assert_eq!(fx.store.hashes_for(&record.id).await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn locked_record_is_reported_as_error() {
        let fx = Fixture::new();
        let record = fx.archive("REC-A", "bytes", None).await;
        let held = fx
            .lock
            .lock(&record.id, "records-officer", Duration::from_secs(60), Duration::ZERO)
            .await
            .unwrap();

        let report = fx
            .verifier(VerifierConfig {
                lock_timeout: Duration::from_millis(50),
                ..VerifierConfig::default()
            })
            .verify_all_records("auditor")
            .await
            .unwrap();
        assert_eq!(report.errors, 1);
        let detail = report.records[0].detail.as_deref().unwrap();
        assert!(detail.contains("locked by records-officer"), "{detail}");

        // The status write is left to whoever holds the lock.
        let stored = fx.store.get_record(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.verification_status, VerificationStatus::Pending);
        fx.lock.unlock(&held).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_run_skips_remaining_records() {
        let fx = Fixture::new();
        for i in 0..5 {
            fx.archive(&format!("REC-{i}"), "bytes", None).await;
        }
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = fx
            .verifier(VerifierConfig::default())
            .verify_all_records_until("auditor", &cancel)
            .await
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.total, 0);
        assert_eq!(report.skipped, 5);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn dispose_honours_hold_and_expiry() {
        let fx = Fixture::new();
        let expired = fx.archive("REC-OLD", "a", Some(at(5))).await;
        let held = fx.archive("REC-HELD", "b", Some(at(5))).await;
        fx.archive("REC-NEW", "c", Some(at(20))).await;
        fx.archive("REC-FOREVER", "d", None).await;
        fx.archive("REC-EDGE", "e", Some(at(10))).await;
        fx.store
            .set_legal_hold(&held.id, held.version, true)
            .await
            .unwrap();

        let report = fx
            .verifier(VerifierConfig::default())
            .dispose_expired_records("records-officer")
            .await
            .unwrap();

        let mut disposed: Vec<_> = report
            .disposed
            .iter()
            .map(|d| d.record.record_number.as_str())
            .collect();
        disposed.sort_unstable();
        assert_eq!(disposed, ["REC-EDGE", "REC-OLD"]);
        assert_eq!(report.held_expired, 1);
        assert!(report.failures.is_empty());

        assert!(fx.store.get_record(&expired.id).await.unwrap().is_none());
        assert!(fx.store.get_record(&held.id).await.unwrap().is_some());
        // Retained by default.
        assert!(fx.content.contains(&expired.storage_path));

        let log = fx.store.disposals().await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.disposed_by == "records-officer" && !e.content_deleted));
    }

    #[tokio::test]
    async fn delete_policy_removes_content() {
        let fx = Fixture::new();
        let record = fx.archive("REC-OLD", "a", Some(at(5))).await;

        let report = fx
            .verifier(VerifierConfig {
                content_policy: ContentPolicy::Delete,
                ..VerifierConfig::default()
            })
            .dispose_expired_records("records-officer")
            .await
            .unwrap();

        assert_eq!(report.count(), 1);
        assert!(report.disposed[0].content_deleted);
        assert!(!fx.content.contains(&record.storage_path));
        assert!(fx.store.disposals().await.unwrap()[0].content_deleted);
    }

    #[tokio::test]
    async fn failed_content_deletion_skips_record() {
        let fx = Fixture::new();
        let stuck = fx.archive("REC-STUCK", "a", Some(at(5))).await;
        fx.archive("REC-OK", "b", Some(at(5))).await;
        fx.content.set_unreadable(stuck.storage_path.clone());

        let report = fx
            .verifier(VerifierConfig {
                content_policy: ContentPolicy::Delete,
                ..VerifierConfig::default()
            })
            .dispose_expired_records("records-officer")
            .await
            .unwrap();

        assert_eq!(report.count(), 1);
        assert_eq!(report.disposed[0].record.record_number, "REC-OK");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record_number, "REC-STUCK");
        assert!(fx.store.get_record(&stuck.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dispose_with_nothing_expired_is_a_no_op() {
        let fx = Fixture::new();
        fx.archive("REC-NEW", "c", Some(at(20))).await;

        let report = fx
            .verifier(VerifierConfig::default())
            .dispose_expired_records("records-officer")
            .await
            .unwrap();
        assert_eq!(report.count(), 0);
        assert_eq!(report.held_expired, 0);
        assert!(fx.store.disposals().await.unwrap().is_empty());
    }

    /// Places a hold on `target` right after the disposal candidates are listed.
    struct HoldAfterListing {
        inner: MemoryRecordStore,
        target: String,
    }

    #[async_trait]
    impl RecordStore for HoldAfterListing {
        async fn insert_record(&self, record: Record) -> Result<Record, StoreError> {
            self.inner.insert_record(record).await
        }
        async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
            self.inner.get_record(id).await
        }
        async fn get_by_number(&self, number: &str) -> Result<Option<Record>, StoreError> {
            self.inner.get_by_number(number).await
        }
        async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
            let page = self.inner.query_records(query).await?;
            if query.expires_at_or_before.is_some() {
                for record in &page.records {
                    if record.record_number == self.target && !record.legal_hold {
                        self.inner
                            .set_legal_hold(&record.id, record.version, true)
                            .await?;
                    }
                }
            }
            Ok(page)
        }
        async fn update_verification(
            &self,
            id: &str,
            expected_version: u64,
            status: VerificationStatus,
            last_verified_at: Option<DateTime<Utc>>,
        ) -> Result<Record, StoreError> {
            self.inner
                .update_verification(id, expected_version, status, last_verified_at)
                .await
        }
        async fn set_legal_hold(
            &self,
            id: &str,
            expected_version: u64,
            legal_hold: bool,
        ) -> Result<Record, StoreError> {
            self.inner.set_legal_hold(id, expected_version, legal_hold).await
        }
        async fn dispose_record(
            &self,
            id: &str,
            expected_version: u64,
            entry: DisposalEntry,
        ) -> Result<Record, StoreError> {
            self.inner.dispose_record(id, expected_version, entry).await
        }
        async fn append_hash(&self, entry: RecordHash) -> Result<(), StoreError> {
            self.inner.append_hash(entry).await
        }
        async fn hashes_for(&self, record_id: &str) -> Result<Vec<RecordHash>, StoreError> {
            self.inner.hashes_for(record_id).await
        }
        async fn disposals(&self) -> Result<Vec<DisposalEntry>, StoreError> {
            self.inner.disposals().await
        }
    }

    #[tokio::test]
    async fn hold_placed_after_selection_spares_record() {
        let fx = Fixture::new();
        let contested = fx.archive("REC-CONTESTED", "a", Some(at(5))).await;
        fx.archive("REC-OLD", "b", Some(at(5))).await;
        let store = Arc::new(HoldAfterListing {
            inner: MemoryRecordStore::from_snapshot(fx.store.snapshot().await),
            target: "REC-CONTESTED".into(),
        });

        let verifier = ArchiveVerifier::builder()
            .store(store.clone())
            .content(fx.content.clone())
            .clock(fx.clock.clone())
            .build()
            .unwrap();
        let report = verifier
            .dispose_expired_records("records-officer")
            .await
            .unwrap();

        assert_eq!(report.count(), 1);
        assert_eq!(report.disposed[0].record.record_number, "REC-OLD");
        assert_eq!(report.held_expired, 1);
        assert!(report.failures.is_empty());

        let survivor = store.get_record(&contested.id).await.unwrap().unwrap();
        assert!(survivor.legal_hold);
        let log = store.disposals().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].record_number, "REC-OLD");
    }

    #[tokio::test]
    async fn stats_reflect_store() {
        let fx = Fixture::new();
        fx.archive("REC-A", "a", Some(at(5))).await;
        fx.archive("REC-B", "b", None).await;
        let verifier = fx.verifier(VerifierConfig::default());

        let stats = verifier.get_record_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.get("contract"), Some(&2));
        assert_eq!(stats.by_status[&VerificationStatus::Pending], 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats, verifier.get_record_stats().await.unwrap());
    }

    /// A store whose reads work but whose writes report a lost connection.
    struct BrokenWrites(MemoryRecordStore);

    #[async_trait]
    impl RecordStore for BrokenWrites {
        async fn insert_record(&self, record: Record) -> Result<Record, StoreError> {
            self.0.insert_record(record).await
        }
        async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
            self.0.get_record(id).await
        }
        async fn get_by_number(&self, number: &str) -> Result<Option<Record>, StoreError> {
            self.0.get_by_number(number).await
        }
        async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
            self.0.query_records(query).await
        }
        async fn update_verification(
            &self,
            _id: &str,
            _expected_version: u64,
            _status: VerificationStatus,
            _last_verified_at: Option<DateTime<Utc>>,
        ) -> Result<Record, StoreError> {
            Err(StoreError::Connection("connection reset".into()))
        }
        async fn set_legal_hold(
            &self,
            id: &str,
            expected_version: u64,
            legal_hold: bool,
        ) -> Result<Record, StoreError> {
            self.0.set_legal_hold(id, expected_version, legal_hold).await
        }
        async fn dispose_record(
            &self,
            _id: &str,
            _expected_version: u64,
            _entry: DisposalEntry,
        ) -> Result<Record, StoreError> {
            Err(StoreError::Connection("connection reset".into()))
        }
        async fn append_hash(&self, entry: RecordHash) -> Result<(), StoreError> {
            self.0.append_hash(entry).await
        }
        async fn hashes_for(&self, record_id: &str) -> Result<Vec<RecordHash>, StoreError> {
            self.0.hashes_for(record_id).await
        }
        async fn disposals(&self) -> Result<Vec<DisposalEntry>, StoreError> {
            self.0.disposals().await
        }
    }

    #[tokio::test]
    async fn store_outage_aborts_runs() {
        let fx = Fixture::new();
        fx.archive("REC-A", "a", Some(at(5))).await;
        let snapshot = fx.store.snapshot().await;
        let broken = Arc::new(BrokenWrites(MemoryRecordStore::from_snapshot(snapshot)));

        let verifier = ArchiveVerifier::builder()
            .store(broken)
            .content(fx.content.clone())
            .clock(fx.clock.clone())
            .build()
            .unwrap();

        let err = verifier.verify_all_records("auditor").await.unwrap_err();
        assert!(err.is_systemic());
        let err = verifier
            .dispose_expired_records("records-officer")
            .await
            .unwrap_err();
        assert!(err.is_systemic());
    }
}
