use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use reliquary_core::{DisposalEntry, Record, RecordHash};
use reliquary_store::StoreError;

use crate::store::MemoryRecordStore;

/// Serializable image of a [`MemoryRecordStore`], used by the file backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
    /// Bumped on every save. A store refuses to overwrite a file whose
    /// generation moved on after the store was loaded.
    #[serde(default)]
    pub generation: u64,
    /// Active records.
    #[serde(default)]
    pub records: Vec<Record>,
    /// Verification trail, including entries for disposed records.
    #[serde(default)]
    pub hashes: Vec<RecordHash>,
    /// Disposal trail.
    #[serde(default)]
    pub disposals: Vec<DisposalEntry>,
}

impl MemoryRecordStore {
    /// Load a store from a JSON snapshot file. A missing file yields an empty store.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let Some(bytes) = read_if_present(path).await? else {
            debug!(path = %path.display(), "snapshot not found, starting empty");
            return Ok(Self::new());
        };

        let snapshot: ArchiveSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?;
        debug!(
            path = %path.display(),
            generation = snapshot.generation,
            records = snapshot.records.len(),
            "snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the store to a JSON snapshot file.
    ///
    /// Fails with [`StoreError::SnapshotChanged`] if another writer saved
    /// the file after this store was loaded. The file is written next to its
    /// destination and renamed into place, so a crash mid-write never leaves
    /// a truncated snapshot behind.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let loaded = self.generation();
        let found = generation_on_disk(path).await?;
        if found != loaded {
            return Err(StoreError::SnapshotChanged {
                path: path.display().to_string(),
                loaded,
                found,
            });
        }

        let mut snapshot = self.snapshot().await;
        snapshot.generation = loaded + 1;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Backend(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Backend(format!("replacing {}: {e}", path.display())))?;
        self.set_generation(snapshot.generation);

        debug!(
            path = %path.display(),
            generation = snapshot.generation,
            records = snapshot.records.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

async fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Connection(format!(
            "reading {}: {e}",
            path.display()
        ))),
    }
}

/// Generation of the snapshot currently at `path`, 0 when there is none.
async fn generation_on_disk(path: &Path) -> Result<u64, StoreError> {
    #[derive(Deserialize)]
    struct Header {
        #[serde(default)]
        generation: u64,
    }

    let Some(bytes) = read_if_present(path).await? else {
        return Ok(0);
    };
    let header: Header = serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?;
    Ok(header.generation)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reliquary_core::{DigestAlgorithm, NewRecord};
    use reliquary_store::RecordStore;

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryRecordStore::load(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");

        let store = MemoryRecordStore::new();
        let record = Record::ingested(
            NewRecord {
                storage_path: "releases/model-042.pdf".into(),
                category: "model_release".into(),
                record_number: Some("MR-042".into()),
                ..NewRecord::default()
            },
            "feed".into(),
            DigestAlgorithm::Sha256,
            Utc::now(),
        );
        store.insert_record(record).await.unwrap();
        store.save(&path).await.unwrap();

        let loaded = MemoryRecordStore::load(&path).await.unwrap();
        let found = loaded.get_by_number("MR-042").await.unwrap().unwrap();
        assert_eq!(found.category, "model_release");
        assert_eq!(found.version, 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn stale_store_cannot_overwrite_newer_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");
        MemoryRecordStore::new().save(&path).await.unwrap();

        let first = MemoryRecordStore::load(&path).await.unwrap();
        let second = MemoryRecordStore::load(&path).await.unwrap();

        let record = Record::ingested(
            NewRecord {
                storage_path: "releases/model-043.pdf".into(),
                category: "model_release".into(),
                record_number: Some("MR-043".into()),
                ..NewRecord::default()
            },
            "feed".into(),
            DigestAlgorithm::Sha256,
            Utc::now(),
        );
        first.insert_record(record).await.unwrap();
        first.save(&path).await.unwrap();
        // A second save from the same store is still allowed.
        first.save(&path).await.unwrap();

        let err = second.save(&path).await.unwrap_err();
        assert!(
            matches!(err, StoreError::SnapshotChanged { loaded: 1, found: 3, .. }),
            "{err}"
        );
        assert!(err.is_systemic());

        let reloaded = MemoryRecordStore::load(&path).await.unwrap();
        assert!(reloaded.get_by_number("MR-043").await.unwrap().is_some());
        reloaded.save(&path).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result = MemoryRecordStore::load(&path).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
