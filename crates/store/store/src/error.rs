use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// An error from the underlying storage backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The record does not exist (or has been disposed).
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same ID or record number already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The record was modified concurrently; the expected row version is stale.
    #[error("version conflict on record {id}: expected {expected}, found {found}")]
    Conflict { id: String, expected: u64, found: u64 },

    /// Another actor kept the record leased past the lock timeout.
    #[error("record {id} is locked by {holder}")]
    RecordLocked { id: String, holder: String },

    /// The snapshot file was rewritten by another process since it was loaded.
    #[error("snapshot {path} changed since it was loaded (generation {loaded}, now {found})")]
    SnapshotChanged {
        path: String,
        loaded: u64,
        found: u64,
    },
}

impl StoreError {
    /// Whether this error means the store as a whole is unusable.
    ///
    /// Systemic errors abort batch runs; the others are scoped to a single
    /// record and are recorded as that record's outcome.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Backend(_)
                | Self::Serialization(_)
                | Self::SnapshotChanged { .. }
        )
    }
}
