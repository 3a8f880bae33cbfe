// src/jobs/locks.rs

//! Target lock table: at most one admitted job per target.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::jobs::lock_table;
use crate::types::JobId;

/// The job currently holding a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    pub job_id: JobId,
    pub tag: String,
}

pub(crate) type LockTable = HashMap<String, LockHolder>;

/// Concurrency-safe map `target -> (job_id, tag)`.
#[derive(Debug, Clone, Default)]
pub struct TargetLocks {
    targets: Arc<Mutex<LockTable>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, target: &str) -> bool {
        lock_table(&self.targets).contains_key(target)
    }

    /// Atomically claim `target` for `job_id`.
    ///
    /// Returns `true` if the target was free (and is now held by `job_id`) or
    /// is already held by `job_id`; `false` if another job holds it.
    pub fn try_acquire(&self, target: &str, job_id: JobId, tag: &str) -> bool {
        self.acquire(target, job_id, tag).is_ok()
    }

    /// Same as [`try_acquire`](Self::try_acquire), but hands back the current
    /// holder on contention. The check and the insert happen under one lock
    /// acquisition, so two callers can never both win.
    pub fn acquire(&self, target: &str, job_id: JobId, tag: &str) -> Result<(), LockHolder> {
        let mut targets = lock_table(&self.targets);
        match targets.get(target) {
            Some(holder) if holder.job_id == job_id => Ok(()),
            Some(holder) => Err(holder.clone()),
            None => {
                targets.insert(
                    target.to_string(),
                    LockHolder {
                        job_id,
                        tag: tag.to_string(),
                    },
                );
                debug!(target, %job_id, tag, "target lock acquired");
                Ok(())
            }
        }
    }

    /// Acquire `target` and return a guard that releases it when dropped.
    pub fn lease(&self, target: &str, job_id: JobId, tag: &str) -> Result<TargetLease, LockHolder> {
        self.acquire(target, job_id, tag)?;
        Ok(TargetLease {
            locks: self.clone(),
            target: target.to_string(),
            job_id,
        })
    }

    /// Remove the entry for `target` regardless of which job holds it.
    pub fn release(&self, target: &str) -> Option<LockHolder> {
        let released = lock_table(&self.targets).remove(target);
        if let Some(holder) = &released {
            debug!(target, job_id = %holder.job_id, "target lock released");
        }
        released
    }

    /// Remove the entry for `target` only if `job_id` still holds it.
    pub fn release_if_held_by(&self, target: &str, job_id: JobId) -> bool {
        let mut targets = lock_table(&self.targets);
        match targets.get(target) {
            Some(holder) if holder.job_id == job_id => {
                targets.remove(target);
                debug!(target, %job_id, "target lock released");
                true
            }
            Some(holder) => {
                warn!(
                    target,
                    %job_id,
                    holder = %holder.job_id,
                    "not releasing target lock held by another job"
                );
                false
            }
            None => false,
        }
    }

    pub fn peek(&self, target: &str) -> Option<LockHolder> {
        lock_table(&self.targets).get(target).cloned()
    }

    pub fn len(&self) -> usize {
        lock_table(&self.targets).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of the whole table.
    pub fn entries(&self) -> Vec<(String, LockHolder)> {
        lock_table(&self.targets)
            .iter()
            .map(|(target, holder)| (target.clone(), holder.clone()))
            .collect()
    }

    /// Hold the table exclusively. Used by the reaper's combined sweep.
    pub(crate) fn lock(&self) -> MutexGuard<'_, LockTable> {
        lock_table(&self.targets)
    }
}

/// Scoped ownership of one target.
///
/// Dropping the lease releases the target if the owning job still holds it,
/// on every exit path of the execution runner, including unwinding.
#[derive(Debug)]
pub struct TargetLease {
    locks: TargetLocks,
    target: String,
    job_id: JobId,
}

impl TargetLease {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Drop for TargetLease {
    fn drop(&mut self) {
        self.locks.release_if_held_by(&self.target, self.job_id);
    }
}
