pub mod digest;
pub mod error;
pub mod record;
pub mod retention;
pub mod stats;
pub mod status;
pub mod verification;

pub use digest::{ContentHasher, DigestAlgorithm};
pub use error::CoreError;
pub use record::{NewRecord, Record};
pub use retention::{ContentPolicy, DisposalEntry, is_disposable};
pub use stats::RecordStats;
pub use status::VerificationStatus;
pub use verification::RecordHash;
