// src/engine/runner.rs

//! Execution of a single admitted job.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::exec::{Invocation, ProcessRunner};
use crate::jobs::{JobRegistry, JobResult, TargetLocks};
use crate::types::JobId;

/// Runs one job's process and publishes its outcome exactly once.
#[derive(Clone)]
pub struct ExecutionRunner {
    registry: JobRegistry,
    locks: TargetLocks,
    backend: Arc<dyn ProcessRunner>,
    executable: String,
    working_dir: PathBuf,
}

impl std::fmt::Debug for ExecutionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRunner")
            .field("executable", &self.executable)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

impl ExecutionRunner {
    pub fn new(
        registry: JobRegistry,
        locks: TargetLocks,
        backend: Arc<dyn ProcessRunner>,
        executable: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            locks,
            backend,
            executable: executable.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Run the job registered under `job_id`.
    ///
    /// - If the target is now held by a different job, the record is marked
    ///   superseded and nothing runs.
    /// - Otherwise the process runs to completion; launch failures and runner
    ///   panics become a result with return code
    ///   [`JobResult::LAUNCH_FAILURE_RC`].
    ///
    /// The result is written before the completion signal is set, and the
    /// target is released after both, on every path.
    pub async fn run(&self, job_id: JobId) {
        let Some(record) = self.registry.get(&job_id) else {
            warn!(%job_id, "job not in registry when its runner started; nothing to run");
            return;
        };

        let lease = match self.locks.lease(&record.target, job_id, &record.tag) {
            Ok(lease) => lease,
            Err(holder) => {
                warn!(
                    %job_id,
                    target = %record.target,
                    holder = %holder.job_id,
                    "target taken by another job before this one started; marking superseded"
                );
                record.supersede(holder.job_id);
                return;
            }
        };

        info!(
            %job_id,
            target = %record.target,
            tag = %record.tag,
            "setting job to started"
        );

        let invocation = Invocation::for_job(&self.executable, &self.working_dir, &record);
        let backend = Arc::clone(&self.backend);

        // Run the backend on its own task so a panic inside it is observed
        // here as a `JoinError` instead of unwinding past the completion.
        let result = match tokio::spawn(async move { backend.run(invocation).await }).await {
            Ok(Ok(output)) => JobResult::from(output),
            Ok(Err(err)) => {
                error!(%job_id, error = %format!("{err:#}"), "playbook process could not be launched");
                JobResult::launch_failure(format!("{err:#}"))
            }
            Err(join_err) => {
                error!(%job_id, error = %join_err, "playbook runner aborted");
                JobResult::launch_failure(format!("playbook runner aborted: {join_err}"))
            }
        };

        info!(%job_id, rc = result.return_code, "return code");
        debug!(%job_id, output = %result.output, "playbook output");
        debug!(%job_id, error = %result.error, "playbook error output");

        if !record.finish(result) {
            warn!(%job_id, "job already completed; discarding second result");
        }

        info!(
            %job_id,
            target = %record.target,
            tag = %record.tag,
            "setting job to completed"
        );

        drop(lease);
    }
}
