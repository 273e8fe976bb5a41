use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::StoreError;

/// Pause between attempts while waiting for a contended record.
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive, time-limited claim on one record.
///
/// A lease that is never returned lapses after its TTL, so a crashed run
/// cannot pin a record forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLease {
    pub record_id: String,
    /// Actor the lease was granted to.
    pub holder: String,
    /// Unique per grant. Unlocking with a stale token is a no-op.
    pub token: String,
}

/// Result of a single attempt to lease a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseAttempt {
    Granted(RecordLease),
    /// Someone else holds an unexpired lease.
    HeldBy(String),
}

/// Per-record leases.
///
/// Verification, disposal and hold changes all lease a record before
/// touching it, so a disposal cannot remove a record halfway through its
/// verification.
#[async_trait]
pub trait RecordLock: Send + Sync {
    /// Lease `record_id` to `holder` for `ttl` unless another unexpired
    /// lease exists.
    async fn try_lock(
        &self,
        record_id: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<LeaseAttempt, StoreError>;

    /// Return a lease. Lapsed or superseded leases are left alone.
    async fn unlock(&self, lease: &RecordLease) -> Result<(), StoreError>;

    /// Lease `record_id`, retrying until `timeout` elapses.
    ///
    /// Fails with [`StoreError::RecordLocked`] naming the holder that kept
    /// the record busy.
    async fn lock(
        &self,
        record_id: &str,
        holder: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<RecordLease, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_lock(record_id, holder, ttl).await? {
                LeaseAttempt::Granted(lease) => return Ok(lease),
                LeaseAttempt::HeldBy(other) if Instant::now() >= deadline => {
                    return Err(StoreError::RecordLocked {
                        id: record_id.to_owned(),
                        holder: other,
                    });
                }
                LeaseAttempt::HeldBy(_) => tokio::time::sleep(RETRY_INTERVAL).await,
            }
        }
    }
}
