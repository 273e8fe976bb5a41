//! Record lifecycle operations around verification and disposal: ingestion,
//! legal holds and the audit trails.

use tracing::{info, instrument};

use reliquary_core::{DisposalEntry, NewRecord, Record, RecordHash};
use reliquary_store::StoreError;

use crate::error::VerifierError;
use crate::verifier::ArchiveVerifier;

impl ArchiveVerifier {
    /// Hash the content at `new.storage_path` and archive it as a new record.
    ///
    /// When no expiry is given, the configured default retention applies.
    #[instrument(skip(self, new), fields(path = %new.storage_path))]
    pub async fn ingest_record(
        &self,
        mut new: NewRecord,
        actor: &str,
    ) -> Result<Record, VerifierError> {
        if let Some(number) = &new.record_number
            && self.store.get_by_number(number).await?.is_some()
        {
            return Err(VerifierError::DuplicateRecord(number.clone()));
        }

        let algorithm = self.config.digest_algorithm;
        let original_hash = self.content.digest(&new.storage_path, algorithm).await?;

        let now = self.clock.now();
        if new.retention_expires_at.is_none() {
            new.retention_expires_at = self.config.default_retention.map(|keep| now + keep);
        }

        let record = Record::ingested(new, original_hash, algorithm, now);
        let stored = self
            .store
            .insert_record(record)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(what) => VerifierError::DuplicateRecord(what),
                other => other.into(),
            })?;

        info!(
            record_number = %stored.record_number,
            category = %stored.category,
            expires_at = ?stored.retention_expires_at,
            ingested_by = actor,
            "record ingested"
        );
        Ok(stored)
    }

    /// Place (`hold = true`) or release a legal hold on a record.
    #[instrument(skip(self))]
    pub async fn set_legal_hold(
        &self,
        record_number: &str,
        hold: bool,
        actor: &str,
    ) -> Result<Record, VerifierError> {
        let record = self.require(record_number).await?;

        let lease = self.lock_record(&record.id, actor).await?;
        let result = self.set_hold_locked(&record.id, record_number, hold).await;
        self.release(&lease).await;

        let updated = result?;
        info!(
            record_number = %updated.record_number,
            legal_hold = updated.legal_hold,
            changed_by = actor,
            "legal hold updated"
        );
        Ok(updated)
    }

    async fn set_hold_locked(
        &self,
        id: &str,
        record_number: &str,
        hold: bool,
    ) -> Result<Record, VerifierError> {
        let current = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| VerifierError::RecordNotFound(record_number.to_owned()))?;
        if current.legal_hold == hold {
            return Ok(current);
        }
        Ok(self
            .store
            .set_legal_hold(id, current.version, hold)
            .await?)
    }

    /// Verification trail of a record, oldest first. Works for disposed
    /// records too.
    pub async fn verification_history(
        &self,
        record_number: &str,
    ) -> Result<Vec<RecordHash>, VerifierError> {
        let record_id = match self.store.get_by_number(record_number).await? {
            Some(record) => record.id,
            None => self
                .store
                .disposals()
                .await?
                .into_iter()
                .rev()
                .find(|entry| entry.record_number == record_number)
                .map(|entry| entry.record_id)
                .ok_or_else(|| VerifierError::RecordNotFound(record_number.to_owned()))?,
        };

        Ok(self.store.hashes_for(&record_id).await?)
    }

    /// Every disposal performed so far, oldest first.
    pub async fn disposal_log(&self) -> Result<Vec<DisposalEntry>, VerifierError> {
        Ok(self.store.disposals().await?)
    }

    async fn require(&self, record_number: &str) -> Result<Record, VerifierError> {
        self.store
            .get_by_number(record_number)
            .await?
            .ok_or_else(|| VerifierError::RecordNotFound(record_number.to_owned()))
    }
}
