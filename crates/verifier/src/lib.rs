//! Verification and disposal engine for archived records.
//!
//! [`ArchiveVerifier`] re-hashes archived content and compares it with the
//! digest captured at ingestion, and disposes of records whose retention has
//! lapsed unless they are under legal hold. Storage, content access, time and
//! locking are injected through traits so every collaborator can be swapped
//! in tests.

pub mod builder;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod records;
pub mod report;
pub mod task;
pub mod verifier;

pub use builder::ArchiveVerifierBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VerifierConfig;
pub use content::{ContentStore, FsContentStore, MemoryContentStore};
pub use error::{ContentError, VerifierError};
pub use report::{
    DisposalFailure, DisposalReport, DisposedRecord, RecordVerification, VerificationReport,
};
pub use task::spawn_maintenance_task;
pub use verifier::ArchiveVerifier;
