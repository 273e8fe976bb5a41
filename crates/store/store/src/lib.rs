pub mod error;
pub mod lock;
pub mod query;
pub mod store;
pub mod testing;

pub use error::StoreError;
pub use lock::{LeaseAttempt, RecordLease, RecordLock};
pub use query::{RecordPage, RecordQuery};
pub use store::RecordStore;
