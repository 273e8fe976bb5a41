//! End-to-end runs against content on disk.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use reliquary_core::{NewRecord, Record, VerificationStatus};
use reliquary_store::RecordStore;
use reliquary_store_memory::MemoryRecordStore;
use reliquary_verifier::{ArchiveVerifier, FsContentStore, ManualClock, VerifierConfig};

struct Archive {
    dir: tempfile::TempDir,
    store: Arc<MemoryRecordStore>,
    clock: Arc<ManualClock>,
    verifier: ArchiveVerifier,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap()
}

impl Archive {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryRecordStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let verifier = ArchiveVerifier::builder()
            .store(store.clone())
            .content(Arc::new(FsContentStore::new(dir.path())))
            .clock(clock.clone())
            .config(VerifierConfig {
                concurrency: 2,
                ..VerifierConfig::default()
            })
            .build()
            .unwrap();
        Self {
            dir,
            store,
            clock,
            verifier,
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    async fn ingest(
        &self,
        name: &str,
        category: &str,
        bytes: &[u8],
        expires: Option<DateTime<Utc>>,
    ) -> Record {
        write(&self.path(name), bytes);
        self.verifier
            .ingest_record(
                NewRecord {
                    storage_path: name.into(),
                    category: category.into(),
                    retention_expires_at: expires,
                    ..NewRecord::default()
                },
                "front-desk",
            )
            .await
            .unwrap()
    }
}

fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn intact_tampered_and_missing_files() {
    let archive = Archive::new();
    let intact = archive.ingest("contracts/a.pdf", "contract", b"alpha", None).await;
    let tampered = archive.ingest("contracts/b.pdf", "contract", b"bravo", None).await;
    let missing = archive.ingest("contracts/c.pdf", "contract", b"charlie", None).await;

    write(&archive.path("contracts/b.pdf"), b"bravo, edited");
    std::fs::remove_file(archive.path("contracts/c.pdf")).unwrap();

    let report = archive.verifier.verify_all_records("auditor").await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.verified, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors, 1);
    assert!(!report.is_clean());

    let status = |id: String| {
        let store = archive.store.clone();
        async move {
            store
                .get_record(&id)
                .await
                .unwrap()
                .unwrap()
                .verification_status
        }
    };
    assert_eq!(status(intact.id.clone()).await, VerificationStatus::Verified);
    assert_eq!(status(tampered.id.clone()).await, VerificationStatus::Failed);
    assert_eq!(status(missing.id.clone()).await, VerificationStatus::Error);

    for record in [&intact, &tampered, &missing] {
        let trail = archive.store.hashes_for(&record.id).await.unwrap();
        assert_eq!(trail.len(), 1, "one entry per record per run");
        assert_eq!(trail[0].expected_hash, record.original_hash);
    }
}

#[tokio::test]
async fn counts_always_add_up() {
    let archive = Archive::new();
    for i in 0..12u8 {
        let name = format!("scans/{i:02}.tiff");
        archive.ingest(&name, "scan", &[i; 32], None).await;
        match i % 3 {
            1 => write(&archive.path(&name), b"overwritten"),
            2 => std::fs::remove_file(archive.path(&name)).unwrap(),
            _ => {}
        }
    }

    let report = archive.verifier.verify_all_records("auditor").await.unwrap();
    assert_eq!(report.verified + report.failed + report.errors, report.total);
    assert_eq!((report.verified, report.failed, report.errors), (4, 4, 4));
    assert_eq!(report.records.len(), 12);
}

#[tokio::test]
async fn empty_archive_verifies_clean() {
    let archive = Archive::new();
    let report = archive.verifier.verify_all_records("auditor").await.unwrap();
    assert_eq!(report.total, 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn legal_hold_outlives_retention() {
    let archive = Archive::new();
    let now = start();
    archive
        .ingest("releases/old.pdf", "model_release", b"old", Some(now - Duration::days(1)))
        .await;
    let held = archive
        .ingest("releases/held.pdf", "model_release", b"held", Some(now - Duration::days(1)))
        .await;
    archive
        .ingest("releases/new.pdf", "model_release", b"new", Some(now + Duration::days(365)))
        .await;
    archive
        .verifier
        .set_legal_hold(&held.record_number, true, "counsel")
        .await
        .unwrap();

    let report = archive
        .verifier
        .dispose_expired_records("records-officer")
        .await
        .unwrap();
    assert_eq!(report.count(), 1);
    assert_eq!(report.disposed[0].record.filename, "old.pdf");
    assert_eq!(report.held_expired, 1);
    // Content is retained unless configured otherwise.
    assert!(archive.path("releases/old.pdf").exists());

    // A year later the held record is still there.
    archive.clock.advance(Duration::days(400));
    let report = archive
        .verifier
        .dispose_expired_records("records-officer")
        .await
        .unwrap();
    assert_eq!(report.count(), 1);
    assert_eq!(report.disposed[0].record.filename, "new.pdf");
    assert!(
        archive
            .store
            .get_record(&held.id)
            .await
            .unwrap()
            .is_some()
    );

    let stats = archive.verifier.get_record_stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.with_legal_hold, 1);
    assert_eq!(stats.expired, 0);
}

#[tokio::test]
async fn stats_are_read_only() {
    let archive = Archive::new();
    let now = start();
    archive.ingest("a.pdf", "contract", b"a", Some(now - Duration::days(1))).await;
    archive.ingest("b.jpg", "proof", b"b", None).await;

    let before = archive.store.snapshot().await;
    let first = archive.verifier.get_record_stats().await.unwrap();
    let second = archive.verifier.get_record_stats().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(before, archive.store.snapshot().await);

    assert_eq!(first.total, 2);
    assert_eq!(first.by_category["contract"], 1);
    assert_eq!(first.by_category["proof"], 1);
    assert_eq!(first.by_status[&VerificationStatus::Pending], 2);
    assert_eq!(first.expired, 1);
}
