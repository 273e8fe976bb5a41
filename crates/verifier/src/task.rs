use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::verifier::ArchiveVerifier;

/// Spawn a background task that verifies the archive and then disposes of
/// expired records every `interval`, until `cancel` fires.
///
/// Returns a `JoinHandle` that resolves once the task has stopped.
pub fn spawn_maintenance_task(
    verifier: Arc<ArchiveVerifier>,
    interval: Duration,
    actor: String,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so nothing runs at
        // startup.
        timer.tick().await;
        info!(interval_secs = interval.as_secs(), "archive maintenance started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            match verifier.verify_all_records_until(&actor, &cancel).await {
                Ok(report) if !report.is_clean() => warn!(
                    failed = report.failed,
                    errors = report.errors,
                    "scheduled verification found problems"
                ),
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "scheduled verification failed");
                    continue;
                }
            }

            if cancel.is_cancelled() {
                break;
            }

            match verifier.dispose_expired_records(&actor).await {
                Ok(report) if !report.failures.is_empty() => warn!(
                    disposed = report.count(),
                    failures = report.failures.len(),
                    "scheduled disposal skipped records"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "scheduled disposal failed"),
            }
        }

        info!("archive maintenance stopped");
    })
}
