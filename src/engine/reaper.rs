// src/engine/reaper.rs

//! Background eviction of stale jobs and fallback release of target locks.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::jobs::{JobRegistry, TargetLocks};
use crate::types::JobId;

/// What one sweep removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Completed jobs older than the retention window.
    pub evicted: Vec<JobId>,
    /// Targets whose lock was still held by an already-completed job.
    pub released: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.released.is_empty()
    }
}

/// Periodic cleanup task.
///
/// States: idle (sleeping) -> scanning -> idle, until the shutdown token
/// fires, after which it is stopped for good. The next sleep only starts
/// once a sweep finishes, so a slow sweep delays later ticks instead of
/// piling them up.
#[derive(Debug, Clone)]
pub struct Reaper {
    registry: JobRegistry,
    locks: TargetLocks,
    interval: Duration,
    retention: Duration,
}

impl Reaper {
    pub fn new(
        registry: JobRegistry,
        locks: TargetLocks,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            registry,
            locks,
            interval,
            retention,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Sweep every `interval` until `shutdown` is cancelled.
    ///
    /// Cancellation interrupts the sleep; a sweep already in progress runs
    /// to the end.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval = ?self.interval,
            retention = ?self.retention,
            "reaper started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let report = self.sweep_at(Utc::now());
            if report.is_empty() {
                debug!("reaper sweep found nothing to clean up");
            } else {
                info!(
                    evicted = report.evicted.len(),
                    released = ?report.released,
                    "reaper sweep"
                );
            }
        }

        info!("reaper stopped");
    }

    /// One sweep, treating `now` as the current time.
    ///
    /// Both tables are held for the whole sweep (registry first), so the
    /// fallback release sees the same job states the eviction does.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut jobs = self.registry.lock();
        let mut targets = self.locks.lock();

        let evicted: Vec<JobId> = jobs
            .values()
            .filter(|record| {
                record
                    .completed_at()
                    .is_some_and(|at| is_older_than(now, at, self.retention))
            })
            .map(|record| record.job_id)
            .collect();

        let released: Vec<String> = targets
            .iter()
            .filter(|(_, holder)| {
                jobs.get(&holder.job_id)
                    .is_some_and(|record| record.is_completed())
            })
            .map(|(target, _)| target.clone())
            .collect();

        for job_id in &evicted {
            jobs.remove(job_id);
        }
        for target in &released {
            if let Some(holder) = targets.remove(target) {
                info!(
                    target = %target,
                    job_id = %holder.job_id,
                    "released target lock left behind by a completed job"
                );
            }
        }

        SweepReport { evicted, released }
    }
}

fn is_older_than(now: DateTime<Utc>, at: DateTime<Utc>, window: Duration) -> bool {
    // `to_std` fails for negative ages (clock went backwards): not old.
    (now - at).to_std().is_ok_and(|age| age > window)
}
