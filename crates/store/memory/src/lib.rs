pub mod lock;
pub mod snapshot;
pub mod store;

pub use lock::MemoryRecordLock;
pub use snapshot::ArchiveSnapshot;
pub use store::MemoryRecordStore;
