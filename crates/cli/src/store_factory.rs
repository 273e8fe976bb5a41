use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs4::fs_std::FileExt;
use tracing::{debug, info};

use reliquary_store::{RecordStore, StoreError};
use reliquary_store_memory::MemoryRecordStore;
#[cfg(feature = "postgres")]
use reliquary_store_postgres::{PostgresRecordStore, PostgresStoreConfig};

use crate::config::StoreConfig;

/// A record store opened from configuration.
///
/// For the `file` backend the snapshot is exclusively locked from open
/// until this value is dropped, so overlapping runs take turns.
pub struct OpenedStore {
    pub store: Arc<dyn RecordStore>,
    /// Snapshot to write back after mutating commands (`file` backend only).
    snapshot: Option<(Arc<MemoryRecordStore>, PathBuf)>,
    _archive_lock: Option<File>,
}

impl OpenedStore {
    /// Persist changes made through [`Self::store`]. A no-op for backends
    /// that write through.
    pub async fn persist(&self) -> Result<(), StoreError> {
        if let Some((store, path)) = &self.snapshot {
            store.save(path).await?;
        }
        Ok(())
    }
}

/// `archive.json` is guarded by `archive.json.lock`.
fn lock_path_for(snapshot: &Path) -> PathBuf {
    let mut name = snapshot.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Block until this process holds the archive's exclusive advisory lock.
async fn lock_archive(snapshot: &Path) -> Result<File, StoreError> {
    let path = lock_path_for(snapshot);
    tokio::task::spawn_blocking(move || {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::Connection(format!("opening {}: {e}", path.display())))?;
        file.lock_exclusive()
            .map_err(|e| StoreError::Connection(format!("locking {}: {e}", path.display())))?;
        debug!(lock = %path.display(), "archive lock acquired");
        Ok(file)
    })
    .await
    .map_err(|e| StoreError::Backend(format!("archive lock task failed: {e}")))?
}

/// Create a record store from the given configuration.
pub async fn open_store(config: &StoreConfig) -> Result<OpenedStore, StoreError> {
    let opened = match config.backend.as_str() {
        "file" => {
            // Load only once the lock is held, so the snapshot is current.
            let lock = lock_archive(&config.path).await?;
            let store = Arc::new(MemoryRecordStore::load(&config.path).await?);
            debug!(path = %config.path.display(), "file store opened");
            OpenedStore {
                store: store.clone(),
                snapshot: Some((store, config.path.clone())),
                _archive_lock: Some(lock),
            }
        }
        "memory" => OpenedStore {
            store: Arc::new(MemoryRecordStore::new()),
            snapshot: None,
            _archive_lock: None,
        },
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.url.as_deref().ok_or_else(|| {
                StoreError::Connection("postgres backend requires [store] url".into())
            })?;
            let pg_config = PostgresStoreConfig::new(url).with_prefix(&config.prefix);
            OpenedStore {
                store: Arc::new(PostgresRecordStore::new(&pg_config).await?),
                snapshot: None,
                _archive_lock: None,
            }
        }
        other => {
            return Err(StoreError::Connection(format!(
                "unsupported store backend: {other}"
            )));
        }
    };

    info!(backend = %config.backend, "record store initialized");
    Ok(opened)
}
