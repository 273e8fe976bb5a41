use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use reliquary_core::{
    DigestAlgorithm, DisposalEntry, NewRecord, Record, RecordHash, VerificationStatus,
};

use crate::error::StoreError;
use crate::lock::{LeaseAttempt, RecordLease, RecordLock};
use crate::query::RecordQuery;
use crate::store::RecordStore;

fn test_record(number: &str, category: &str) -> Record {
    Record::ingested(
        NewRecord {
            storage_path: format!("conformance/{number}.bin"),
            category: category.to_owned(),
            record_number: Some(number.to_owned()),
            ..NewRecord::default()
        },
        "0000".to_owned(),
        DigestAlgorithm::Sha256,
        Utc::now(),
    )
}

/// Run the full record store conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn RecordStore) -> Result<(), StoreError> {
    test_get_missing(store).await?;
    test_insert_and_get(store).await?;
    test_insert_duplicate_number(store).await?;
    test_update_verification(store).await?;
    test_version_conflict(store).await?;
    test_legal_hold(store).await?;
    test_dispose(store).await?;
    test_hashes_append_only(store).await?;
    test_query_filters(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn RecordStore) -> Result<(), StoreError> {
    assert!(store.get_record("missing").await?.is_none());
    assert!(store.get_by_number("REC-MISSING").await?.is_none());
    Ok(())
}

async fn test_insert_and_get(store: &dyn RecordStore) -> Result<(), StoreError> {
    let record = test_record("CT-INSERT", "contract");
    let stored = store.insert_record(record.clone()).await?;
    assert_eq!(stored.version, 1, "inserted records start at version 1");

    let by_id = store.get_record(&record.id).await?.expect("record by id");
    assert_eq!(by_id.record_number, "CT-INSERT");
    assert_eq!(by_id.verification_status, VerificationStatus::Pending);

    let by_number = store.get_by_number("CT-INSERT").await?.expect("record by number");
    assert_eq!(by_number.id, record.id);
    Ok(())
}

async fn test_insert_duplicate_number(store: &dyn RecordStore) -> Result<(), StoreError> {
    store.insert_record(test_record("CT-DUP", "contract")).await?;
    let result = store.insert_record(test_record("CT-DUP", "contract")).await;
    assert!(
        matches!(result, Err(StoreError::Duplicate(_))),
        "duplicate record number should be rejected"
    );
    Ok(())
}

async fn test_update_verification(store: &dyn RecordStore) -> Result<(), StoreError> {
    let stored = store.insert_record(test_record("CT-VERIFY", "contract")).await?;
    let now = Utc::now();

    let updated = store
        .update_verification(&stored.id, stored.version, VerificationStatus::Verified, Some(now))
        .await?;
    assert_eq!(updated.verification_status, VerificationStatus::Verified);
    assert_eq!(updated.version, stored.version + 1);
    let verified_at = updated.last_verified_at.expect("timestamp set");
    assert!((verified_at - now).num_milliseconds().abs() < 1000);

    let errored = store
        .update_verification(&stored.id, updated.version, VerificationStatus::Error, None)
        .await?;
    assert_eq!(errored.verification_status, VerificationStatus::Error);
    assert_eq!(
        errored.last_verified_at, updated.last_verified_at,
        "None leaves last_verified_at untouched"
    );
    Ok(())
}

async fn test_version_conflict(store: &dyn RecordStore) -> Result<(), StoreError> {
    let stored = store.insert_record(test_record("CT-CONFLICT", "contract")).await?;
    store
        .update_verification(&stored.id, stored.version, VerificationStatus::Verified, None)
        .await?;

    let stale = store
        .update_verification(&stored.id, stored.version, VerificationStatus::Failed, None)
        .await;
    assert!(
        matches!(stale, Err(StoreError::Conflict { .. })),
        "stale version should conflict"
    );

    let missing = store
        .update_verification("no-such-record", 1, VerificationStatus::Failed, None)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
    Ok(())
}

async fn test_legal_hold(store: &dyn RecordStore) -> Result<(), StoreError> {
    let stored = store.insert_record(test_record("CT-HOLD", "contract")).await?;
    let held = store.set_legal_hold(&stored.id, stored.version, true).await?;
    assert!(held.legal_hold);
    let released = store.set_legal_hold(&held.id, held.version, false).await?;
    assert!(!released.legal_hold);
    assert_eq!(released.version, stored.version + 2);
    Ok(())
}

async fn test_dispose(store: &dyn RecordStore) -> Result<(), StoreError> {
    let stored = store.insert_record(test_record("CT-DISPOSE", "contract")).await?;
    let entry = DisposalEntry::for_record(&stored, "system", Utc::now(), false);

    let stale = store
        .dispose_record(&stored.id, stored.version + 5, entry.clone())
        .await;
    assert!(matches!(stale, Err(StoreError::Conflict { .. })));
    assert!(store.get_record(&stored.id).await?.is_some());

    let removed = store.dispose_record(&stored.id, stored.version, entry).await?;
    assert_eq!(removed.id, stored.id);
    assert!(store.get_record(&stored.id).await?.is_none());
    assert!(store.get_by_number("CT-DISPOSE").await?.is_none());

    let log = store.disposals().await?;
    assert!(log.iter().any(|e| e.record_id == stored.id));

    let again = store
        .dispose_record(
            &stored.id,
            stored.version,
            DisposalEntry::for_record(&stored, "system", Utc::now(), false),
        )
        .await;
    assert!(matches!(again, Err(StoreError::NotFound(_))));
    Ok(())
}

async fn test_hashes_append_only(store: &dyn RecordStore) -> Result<(), StoreError> {
    let stored = store.insert_record(test_record("CT-HASHES", "contract")).await?;
    let first = RecordHash::computed(&stored, "0000".into(), "system", Utc::now());
    let second = RecordHash::errored(
        &stored,
        "missing",
        "system",
        Utc::now() + ChronoDuration::seconds(1),
    );
    store.append_hash(first.clone()).await?;
    store.append_hash(second.clone()).await?;

    let trail = store.hashes_for(&stored.id).await?;
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].id, first.id, "oldest entry first");
    assert!(trail[0].matched);
    assert!(!trail[1].matched);

    store
        .dispose_record(
            &stored.id,
            stored.version,
            DisposalEntry::for_record(&stored, "system", Utc::now(), false),
        )
        .await?;
    assert_eq!(
        store.hashes_for(&stored.id).await?.len(),
        2,
        "audit trail survives disposal"
    );
    Ok(())
}

async fn test_query_filters(store: &dyn RecordStore) -> Result<(), StoreError> {
    let mut expired = test_record("QF-EXPIRED", "query-filter");
    expired.retention_expires_at = Some(Utc::now() - ChronoDuration::days(1));
    store.insert_record(expired).await?;

    let mut held = test_record("QF-HELD", "query-filter");
    held.legal_hold = true;
    store.insert_record(held).await?;

    store.insert_record(test_record("QF-PLAIN", "query-filter")).await?;

    let all = store
        .query_records(&RecordQuery {
            category: Some("query-filter".into()),
            ..RecordQuery::default()
        })
        .await?;
    assert_eq!(all.total, 3);
    let numbers: Vec<_> = all.records.iter().map(|r| r.record_number.as_str()).collect();
    assert_eq!(numbers, ["QF-EXPIRED", "QF-HELD", "QF-PLAIN"], "ordered by number");

    let held_only = store
        .query_records(&RecordQuery {
            category: Some("query-filter".into()),
            legal_hold: Some(true),
            ..RecordQuery::default()
        })
        .await?;
    assert_eq!(held_only.total, 1);
    assert_eq!(held_only.records[0].record_number, "QF-HELD");

    let expired_only = store
        .query_records(&RecordQuery {
            category: Some("query-filter".into()),
            expires_at_or_before: Some(Utc::now()),
            ..RecordQuery::default()
        })
        .await?;
    assert_eq!(expired_only.total, 1);
    assert_eq!(expired_only.records[0].record_number, "QF-EXPIRED");

    let paged = store
        .query_records(&RecordQuery {
            category: Some("query-filter".into()),
            limit: Some(2),
            offset: Some(2),
            ..RecordQuery::default()
        })
        .await?;
    assert_eq!(paged.total, 3);
    assert_eq!(paged.records.len(), 1);
    assert_eq!(paged.records[0].record_number, "QF-PLAIN");
    Ok(())
}

/// Run the record lock conformance test suite.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_lock_conformance_tests(lock: &dyn RecordLock) -> Result<(), StoreError> {
    test_lease_and_return(lock).await?;
    test_contended_lease_names_holder(lock).await?;
    test_stale_unlock_is_ignored(lock).await?;
    test_lock_times_out(lock).await?;
    Ok(())
}

fn granted(attempt: LeaseAttempt) -> RecordLease {
    match attempt {
        LeaseAttempt::Granted(lease) => lease,
        LeaseAttempt::HeldBy(holder) => panic!("record unexpectedly leased by {holder}"),
    }
}

async fn test_lease_and_return(lock: &dyn RecordLock) -> Result<(), StoreError> {
    let lease = granted(lock.try_lock("lease-1", "auditor", Duration::from_secs(10)).await?);
    assert_eq!(lease.record_id, "lease-1");
    assert_eq!(lease.holder, "auditor");
    lock.unlock(&lease).await?;

    let again = granted(lock.try_lock("lease-1", "officer", Duration::from_secs(10)).await?);
    assert_ne!(again.token, lease.token, "each grant gets a fresh token");
    lock.unlock(&again).await?;
    Ok(())
}

async fn test_contended_lease_names_holder(lock: &dyn RecordLock) -> Result<(), StoreError> {
    let held = granted(lock.try_lock("lease-2", "auditor", Duration::from_secs(10)).await?);

    let second = lock.try_lock("lease-2", "officer", Duration::from_secs(10)).await?;
    assert_eq!(second, LeaseAttempt::HeldBy("auditor".to_owned()));

    // Leases are per record.
    let other = granted(lock.try_lock("lease-2b", "officer", Duration::from_secs(10)).await?);

    lock.unlock(&held).await?;
    lock.unlock(&other).await?;
    Ok(())
}

async fn test_stale_unlock_is_ignored(lock: &dyn RecordLock) -> Result<(), StoreError> {
    let held = granted(lock.try_lock("lease-3", "auditor", Duration::from_secs(10)).await?);
    let forged = RecordLease {
        token: "not-the-token".to_owned(),
        ..held.clone()
    };
    lock.unlock(&forged).await?;

    let second = lock.try_lock("lease-3", "officer", Duration::from_secs(10)).await?;
    assert_eq!(second, LeaseAttempt::HeldBy("auditor".to_owned()));

    lock.unlock(&held).await?;
    Ok(())
}

async fn test_lock_times_out(lock: &dyn RecordLock) -> Result<(), StoreError> {
    let held = granted(lock.try_lock("lease-4", "auditor", Duration::from_secs(10)).await?);

    let result = lock
        .lock(
            "lease-4",
            "officer",
            Duration::from_secs(10),
            Duration::from_millis(100),
        )
        .await;
    assert!(matches!(
        result,
        Err(StoreError::RecordLocked { id, holder }) if id == "lease-4" && holder == "auditor"
    ));

    lock.unlock(&held).await?;
    Ok(())
}
