use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use uuid::Uuid;

use reliquary_store::{LeaseAttempt, RecordLease, RecordLock, StoreError};

#[derive(Debug, Clone)]
struct ActiveLease {
    holder: String,
    token: String,
    expires_at: Instant,
}

/// In-process [`RecordLock`]: one lease slot per record ID.
///
/// A lapsed lease is replaced by the next request for the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordLock {
    leases: Arc<DashMap<String, ActiveLease>>,
}

impl MemoryRecordLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordLock for MemoryRecordLock {
    async fn try_lock(
        &self,
        record_id: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<LeaseAttempt, StoreError> {
        let now = Instant::now();
        let grant = ActiveLease {
            holder: holder.to_owned(),
            token: Uuid::now_v7().to_string(),
            expires_at: now + ttl,
        };

        // The shard lock makes check-and-insert atomic per record.
        match self.leases.entry(record_id.to_owned()) {
            Entry::Occupied(current) if now < current.get().expires_at => {
                Ok(LeaseAttempt::HeldBy(current.get().holder.clone()))
            }
            Entry::Occupied(mut lapsed) => {
                lapsed.insert(grant.clone());
                Ok(LeaseAttempt::Granted(lease_for(record_id, grant)))
            }
            Entry::Vacant(slot) => {
                slot.insert(grant.clone());
                Ok(LeaseAttempt::Granted(lease_for(record_id, grant)))
            }
        }
    }

    async fn unlock(&self, lease: &RecordLease) -> Result<(), StoreError> {
        self.leases
            .remove_if(&lease.record_id, |_, active| active.token == lease.token);
        Ok(())
    }
}

fn lease_for(record_id: &str, grant: ActiveLease) -> RecordLease {
    RecordLease {
        record_id: record_id.to_owned(),
        holder: grant.holder,
        token: grant.token,
    }
}
