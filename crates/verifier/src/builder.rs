use std::sync::Arc;

use reliquary_store::{RecordLock, RecordStore};
use reliquary_store_memory::MemoryRecordLock;

use crate::clock::{Clock, SystemClock};
use crate::config::VerifierConfig;
use crate::content::ContentStore;
use crate::error::VerifierError;
use crate::verifier::ArchiveVerifier;

/// Fluent builder for constructing an [`ArchiveVerifier`].
///
/// A [`RecordStore`] and a [`ContentStore`] must be supplied. The lock
/// defaults to an in-process [`MemoryRecordLock`], the clock to wall-clock
/// time, and the configuration to [`VerifierConfig::default`].
#[derive(Default)]
pub struct ArchiveVerifierBuilder {
    store: Option<Arc<dyn RecordStore>>,
    content: Option<Arc<dyn ContentStore>>,
    lock: Option<Arc<dyn RecordLock>>,
    clock: Option<Arc<dyn Clock>>,
    config: VerifierConfig,
}

impl ArchiveVerifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn content(mut self, content: Arc<dyn ContentStore>) -> Self {
        self.content = Some(content);
        self
    }

    /// Share per-record locks with other verifiers, e.g. across processes.
    #[must_use]
    pub fn lock(mut self, lock: Arc<dyn RecordLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ArchiveVerifier, VerifierError> {
        let store = self
            .store
            .ok_or_else(|| VerifierError::Configuration("record store is required".into()))?;

        let content = self
            .content
            .ok_or_else(|| VerifierError::Configuration("content store is required".into()))?;

        if self.config.concurrency == 0 {
            return Err(VerifierError::Configuration(
                "concurrency must be at least 1".into(),
            ));
        }

        let lock = self
            .lock
            .unwrap_or_else(|| Arc::new(MemoryRecordLock::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(ArchiveVerifier {
            store,
            content,
            lock,
            clock,
            config: self.config,
        })
    }
}
