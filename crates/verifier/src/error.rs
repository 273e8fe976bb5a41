use thiserror::Error;

use reliquary_store::StoreError;

/// Errors raised while reading or removing archived content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// No content exists at the storage path.
    #[error("content not found: {0}")]
    NotFound(String),

    /// The content exists but could not be read or removed.
    #[error("content I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by [`ArchiveVerifier`](crate::ArchiveVerifier) operations.
///
/// Per-record problems during verification and disposal runs are folded into
/// the run's report. An error escaping a run means the run itself could not
/// continue.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// An error occurred in the record store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error occurred while accessing archived content.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// The requested record does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A record with the same number is already archived.
    #[error("record already exists: {0}")]
    DuplicateRecord(String),

    /// The verifier was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl VerifierError {
    /// Whether the error reflects an unavailable backend rather than a
    /// problem with the request.
    pub fn is_systemic(&self) -> bool {
        match self {
            Self::Store(e) => e.is_systemic(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_systemic() {
        assert!(VerifierError::Store(StoreError::Connection("down".into())).is_systemic());
        assert!(!VerifierError::Store(StoreError::NotFound("r1".into())).is_systemic());
        assert!(!VerifierError::RecordNotFound("REC-1".into()).is_systemic());
        assert!(!VerifierError::Content(ContentError::NotFound("a.pdf".into())).is_systemic());
    }
}
