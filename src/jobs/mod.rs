// src/jobs/mod.rs

//! Shared job state: the per-job record, the job registry and the target
//! lock table.
//!
//! Both tables are cheap-to-clone handles around a `Mutex`-protected map, so
//! the dispatcher, every execution runner and the reaper share one instance
//! without any process-wide singleton.
//!
//! Lock order: whenever both tables must be held at once (only the reaper's
//! sweep does this), take the registry first and the lock table second.

pub mod locks;
pub mod record;
pub mod registry;

pub use locks::{LockHolder, TargetLease, TargetLocks};
pub use record::{Completion, CompletionSignal, JobRecord, JobResult, Outcome};
pub use registry::JobRegistry;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a table mutex, recovering the data if a previous holder panicked.
///
/// Every critical section over these maps is a single insert/remove/lookup,
/// so a poisoned map is still consistent.
pub(crate) fn lock_table<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
