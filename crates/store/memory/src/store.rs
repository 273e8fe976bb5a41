use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;

use reliquary_core::{DisposalEntry, Record, RecordHash, VerificationStatus};
use reliquary_store::{RecordPage, RecordQuery, RecordStore, StoreError};

use crate::snapshot::ArchiveSnapshot;

/// In-memory record store using `DashMap`.
///
/// Records are stored in a concurrent hash map keyed by record ID, with a
/// secondary index from record number to ID. Version checks happen under the
/// record's shard lock, so concurrent writers to the same record serialize.
pub struct MemoryRecordStore {
    /// Primary store: record ID -> `Record`.
    records: DashMap<String, Record>,
    /// Secondary index: record number -> record ID.
    number_index: DashMap<String, String>,
    /// Verification trail: record ID -> entries in append order.
    hashes: DashMap<String, Vec<RecordHash>>,
    /// Disposal trail in append order.
    disposals: RwLock<Vec<DisposalEntry>>,
    /// Snapshot generation this store was loaded from or last saved as.
    generation: AtomicU64,
}

impl MemoryRecordStore {
    /// Create a new empty in-memory record store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            number_index: DashMap::new(),
            hashes: DashMap::new(),
            disposals: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: ArchiveSnapshot) -> Self {
        let store = Self {
            disposals: RwLock::new(snapshot.disposals),
            generation: AtomicU64::new(snapshot.generation),
            ..Self::new()
        };
        for record in snapshot.records {
            store
                .number_index
                .insert(record.record_number.clone(), record.id.clone());
            store.records.insert(record.id.clone(), record);
        }
        for entry in snapshot.hashes {
            store
                .hashes
                .entry(entry.record_id.clone())
                .or_default()
                .push(entry);
        }
        store
    }

    /// Capture the full store contents.
    ///
    /// Records are ordered by record number and verification entries by
    /// timestamp, so equal stores produce equal snapshots.
    pub async fn snapshot(&self) -> ArchiveSnapshot {
        let mut records: Vec<Record> = self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.record_number.cmp(&b.record_number));

        let mut hashes: Vec<RecordHash> = self
            .hashes
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        hashes.sort_by(|a, b| a.verified_at.cmp(&b.verified_at).then(a.id.cmp(&b.id)));

        ArchiveSnapshot {
            generation: self.generation(),
            records,
            hashes,
            disposals: self.disposals.read().await.clone(),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    fn conflict_or_missing(&self, id: &str, expected: u64) -> StoreError {
        match self.records.get(id) {
            Some(rec) => StoreError::Conflict {
                id: id.to_owned(),
                expected,
                found: rec.version,
            },
            None => StoreError::NotFound(id.to_owned()),
        }
    }

    /// Apply `mutate` to the record if its version matches, bumping the version.
    fn mutate(
        &self,
        id: &str,
        expected_version: u64,
        mutate: impl FnOnce(&mut Record),
    ) -> Result<Record, StoreError> {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        let record = entry.value_mut();
        if record.version != expected_version {
            return Err(StoreError::Conflict {
                id: id.to_owned(),
                expected: expected_version,
                found: record.version,
            });
        }
        mutate(record);
        record.version += 1;
        Ok(record.clone())
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_record(&self, record: Record) -> Result<Record, StoreError> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }

        match self.number_index.entry(record.record_number.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.record_number)),
            Entry::Vacant(vacant) => {
                vacant.insert(record.id.clone());
                let mut stored = record;
                stored.version = 1;
                self.records.insert(stored.id.clone(), stored.clone());
                Ok(stored)
            }
        }
    }

    async fn get_record(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn get_by_number(&self, record_number: &str) -> Result<Option<Record>, StoreError> {
        let Some(id) = self.number_index.get(record_number).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn query_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let limit = query.effective_limit();
        let offset = query.effective_offset();

        let mut matching: Vec<Record> = self
            .records
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(|a, b| a.record_number.cmp(&b.record_number));

        let total = matching.len() as u64;
        let records: Vec<Record> = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(RecordPage {
            records,
            total,
            limit,
            offset,
        })
    }

    async fn update_verification(
        &self,
        id: &str,
        expected_version: u64,
        status: VerificationStatus,
        last_verified_at: Option<DateTime<Utc>>,
    ) -> Result<Record, StoreError> {
        self.mutate(id, expected_version, |record| {
            record.verification_status = status;
            if let Some(at) = last_verified_at {
                record.last_verified_at = Some(at);
            }
        })
    }

    async fn set_legal_hold(
        &self,
        id: &str,
        expected_version: u64,
        legal_hold: bool,
    ) -> Result<Record, StoreError> {
        self.mutate(id, expected_version, |record| {
            record.legal_hold = legal_hold;
        })
    }

    async fn dispose_record(
        &self,
        id: &str,
        expected_version: u64,
        entry: DisposalEntry,
    ) -> Result<Record, StoreError> {
        let Some((_, removed)) = self
            .records
            .remove_if(id, |_, rec| rec.version == expected_version)
        else {
            return Err(self.conflict_or_missing(id, expected_version));
        };

        self.number_index
            .remove_if(&removed.record_number, |_, mapped| mapped == id);
        self.disposals.write().await.push(entry);
        Ok(removed)
    }

    async fn append_hash(&self, entry: RecordHash) -> Result<(), StoreError> {
        self.hashes
            .entry(entry.record_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn hashes_for(&self, record_id: &str) -> Result<Vec<RecordHash>, StoreError> {
        Ok(self
            .hashes
            .get(record_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn disposals(&self) -> Result<Vec<DisposalEntry>, StoreError> {
        Ok(self.disposals.read().await.clone())
    }
}
