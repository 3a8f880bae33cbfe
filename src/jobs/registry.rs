// src/jobs/registry.rs

//! Authoritative map from job id to job record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::jobs::lock_table;
use crate::jobs::record::JobRecord;
use crate::types::JobId;

pub(crate) type JobTable = HashMap<JobId, Arc<JobRecord>>;

/// Concurrency-safe job registry.
///
/// Cloning yields another handle to the same registry. Records are shared as
/// `Arc<JobRecord>`, so readers keep a record alive even after the reaper
/// removes it from the map.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<JobTable>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its own `job_id`.
    ///
    /// Callers guarantee the id is fresh; an existing entry would be replaced.
    pub fn put(&self, record: Arc<JobRecord>) {
        let job_id = record.job_id;
        lock_table(&self.jobs).insert(job_id, record);
        debug!(%job_id, "job registered");
    }

    pub fn get(&self, job_id: &JobId) -> Option<Arc<JobRecord>> {
        lock_table(&self.jobs).get(job_id).cloned()
    }

    /// Remove a record if present. Returns the removed record.
    pub fn delete(&self, job_id: &JobId) -> Option<Arc<JobRecord>> {
        lock_table(&self.jobs).remove(job_id)
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        lock_table(&self.jobs).contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        lock_table(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time snapshot of all records.
    ///
    /// The map lock is released before the iterator is returned, so iterating
    /// never blocks writers.
    pub fn iter(&self) -> std::vec::IntoIter<Arc<JobRecord>> {
        let snapshot: Vec<Arc<JobRecord>> = lock_table(&self.jobs).values().cloned().collect();
        snapshot.into_iter()
    }

    /// Hold the registry exclusively. Used by the reaper's combined sweep.
    pub(crate) fn lock(&self) -> MutexGuard<'_, JobTable> {
        lock_table(&self.jobs)
    }
}
