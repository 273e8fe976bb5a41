use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reliquary_core::{DisposalEntry, Record, RecordHash, VerificationStatus};

use crate::error::StoreError;
use crate::query::{RecordPage, RecordQuery};

/// Trait for record storage backends.
///
/// Every mutation of a record takes the row version the caller last saw and
/// fails with [`StoreError::Conflict`] if the stored version differs. Each
/// successful mutation bumps the version by one.
///
/// Implementations must be `Send + Sync` to be shared across async tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record. The stored copy (version 1) is returned.
    ///
    /// Fails with [`StoreError::Duplicate`] if the ID or record number is taken.
    async fn insert_record(&self, record: Record) -> Result<Record, StoreError>;

    /// Retrieve an active record by ID.
    async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Retrieve an active record by its record number.
    async fn get_by_number(&self, record_number: &str) -> Result<Option<Record>, StoreError>;

    /// Query active records with filters and pagination.
    async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError>;

    /// Write the outcome of a verification run.
    ///
    /// `last_verified_at` replaces the stored timestamp when `Some` and leaves
    /// it untouched when `None`.
    async fn update_verification(
        &self,
        id: &str,
        expected_version: u64,
        status: VerificationStatus,
        last_verified_at: Option<DateTime<Utc>>,
    ) -> Result<Record, StoreError>;

    /// Place or release a legal hold.
    async fn set_legal_hold(
        &self,
        id: &str,
        expected_version: u64,
        legal_hold: bool,
    ) -> Result<Record, StoreError>;

    /// Remove a record from the active set and append its disposal entry,
    /// as one unit. Returns the removed record.
    async fn dispose_record(
        &self,
        id: &str,
        expected_version: u64,
        entry: DisposalEntry,
    ) -> Result<Record, StoreError>;

    /// Append a verification audit entry.
    async fn append_hash(&self, entry: RecordHash) -> Result<(), StoreError>;

    /// Verification audit entries for a record, oldest first. Entries remain
    /// available after the record is disposed.
    async fn hashes_for(&self, record_id: &str) -> Result<Vec<RecordHash>, StoreError>;

    /// All disposal entries, oldest first.
    async fn disposals(&self) -> Result<Vec<DisposalEntry>, StoreError>;

    /// Every active record, fetched page by page.
    async fn list_active(&self) -> Result<Vec<Record>, StoreError> {
        self.list_matching(RecordQuery::default()).await
    }

    /// Every active record matching the filters of `query`, fetched page by
    /// page. The query's own `limit` and `offset` are ignored.
    async fn list_matching(&self, query: RecordQuery) -> Result<Vec<Record>, StoreError> {
        let page_size: u32 = 1000;
        let mut offset = 0u32;
        let mut all = Vec::new();

        loop {
            let query = RecordQuery {
                limit: Some(page_size),
                offset: Some(offset),
                ..query.clone()
            };
            let page = self.query_records(&query).await?;
            let fetched = page.records.len();
            all.extend(page.records);

            if fetched < usize::try_from(page_size).unwrap_or(usize::MAX) {
                break;
            }
            offset = offset.saturating_add(page_size);
        }

        Ok(all)
    }
}
