use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::io::AsyncReadExt;
use tracing::debug;

use reliquary_core::DigestAlgorithm;

use crate::error::ContentError;

const READ_CHUNK: usize = 64 * 1024;

/// Access to archived file content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Hash the content at `path`.
    async fn digest(&self, path: &str, algorithm: DigestAlgorithm) -> Result<String, ContentError>;

    /// Remove the content at `path`. Removing absent content is not an error.
    async fn delete(&self, path: &str) -> Result<(), ContentError>;
}

/// Content stored on the local filesystem.
///
/// Relative storage paths resolve against `root`; absolute paths are used
/// as they are.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn digest(&self, path: &str, algorithm: DigestAlgorithm) -> Result<String, ContentError> {
        let resolved = self.resolve(path);
        let io_error = |source: std::io::Error| {
            if source.kind() == ErrorKind::NotFound {
                ContentError::NotFound(path.to_owned())
            } else {
                ContentError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        };

        let mut file = tokio::fs::File::open(&resolved).await.map_err(io_error)?;
        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let read = file.read(&mut buf).await.map_err(io_error)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        Ok(hasher.finalize_hex())
    }

    async fn delete(&self, path: &str) -> Result<(), ContentError> {
        let resolved = self.resolve(path);
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path, "content already absent");
                Ok(())
            }
            Err(source) => Err(ContentError::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

/// In-memory content keyed by storage path.
///
/// Paths marked unreadable fail with an I/O error, which makes it easy to
/// exercise error handling without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    files: DashMap<String, Vec<u8>>,
    unreadable: DashSet<String>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the content at `path`.
    pub fn put(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    /// Drop the content at `path` behind the archive's back.
    pub fn remove(&self, path: &str) {
        self.files.remove(path);
    }

    /// Make every read and removal at `path` fail.
    pub fn set_unreadable(&self, path: impl Into<String>) {
        self.unreadable.insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn check_readable(&self, path: &str) -> Result<(), ContentError> {
        if self.unreadable.contains(path) {
            return Err(ContentError::Io {
                path: path.to_owned(),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "permission denied"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn digest(&self, path: &str, algorithm: DigestAlgorithm) -> Result<String, ContentError> {
        self.check_readable(path)?;
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| ContentError::NotFound(path.to_owned()))?;
        Ok(algorithm.digest(&bytes))
    }

    async fn delete(&self, path: &str) -> Result<(), ContentError> {
        self.check_readable(path)?;
        self.files.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_digest_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        // Larger than one read chunk so the streaming path is exercised.
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("scan.tiff"), &bytes).unwrap();

        let store = FsContentStore::new(dir.path());
        let hashed = store.digest("scan.tiff", DigestAlgorithm::Sha256).await.unwrap();
        assert_eq!(hashed, DigestAlgorithm::Sha256.digest(&bytes));
    }

    #[tokio::test]
    async fn fs_absolute_path_ignores_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("invoice.pdf");
        std::fs::write(&file, b"invoice").unwrap();

        let store = FsContentStore::new("/nonexistent-root");
        let hashed = store
            .digest(file.to_str().unwrap(), DigestAlgorithm::Sha512)
            .await
            .unwrap();
        assert_eq!(hashed, DigestAlgorithm::Sha512.digest(b"invoice"));
    }

    #[tokio::test]
    async fn fs_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        let err = store
            .digest("gone.pdf", DigestAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(p) if p == "gone.pdf"));
    }

    #[tokio::test]
    async fn fs_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("release.pdf"), b"signed").unwrap();

        let store = FsContentStore::new(dir.path());
        store.delete("release.pdf").await.unwrap();
        assert!(!dir.path().join("release.pdf").exists());
        store.delete("release.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_simulates_failures() {
        let store = MemoryContentStore::new();
        store.put("a.pdf", "alpha");
        store.set_unreadable("b.pdf");

        assert_eq!(
            store.digest("a.pdf", DigestAlgorithm::Sha256).await.unwrap(),
            DigestAlgorithm::Sha256.digest(b"alpha")
        );
        assert!(matches!(
            store.digest("b.pdf", DigestAlgorithm::Sha256).await,
            Err(ContentError::Io { .. })
        ));
        assert!(matches!(
            store.digest("c.pdf", DigestAlgorithm::Sha256).await,
            Err(ContentError::NotFound(_))
        ));
    }
}
