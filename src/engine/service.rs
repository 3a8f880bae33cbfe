// src/engine/service.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ConfigFile;
use crate::engine::dispatcher::{Dispatcher, SubmitRequest};
use crate::engine::lifecycle::Lifecycle;
use crate::engine::reaper::Reaper;
use crate::engine::runner::ExecutionRunner;
use crate::engine::status::JobStatus;
use crate::errors::{DispatchError, Result};
use crate::exec::ProcessRunner;
use crate::jobs::{JobRegistry, TargetLocks};
use crate::types::JobId;

/// One process-wide instance of the engine: registry, lock table,
/// dispatcher, reaper and lifecycle, wired together.
#[derive(Debug)]
pub struct JobEngine {
    config: Arc<ConfigFile>,
    registry: JobRegistry,
    locks: TargetLocks,
    dispatcher: Dispatcher,
    lifecycle: Lifecycle,
}

impl JobEngine {
    pub fn new(config: ConfigFile, backend: Arc<dyn ProcessRunner>) -> Self {
        let config = Arc::new(config);
        let registry = JobRegistry::new();
        let locks = TargetLocks::new();
        let lifecycle = Lifecycle::new();

        let runner = ExecutionRunner::new(
            registry.clone(),
            locks.clone(),
            backend,
            config.executable(),
            config.working_dir(),
        );

        let dispatcher = Dispatcher::new(
            Arc::clone(&config),
            registry.clone(),
            locks.clone(),
            runner,
            lifecycle.runners(),
            lifecycle.shutdown_token(),
        );

        Self {
            config,
            registry,
            locks,
            dispatcher,
            lifecycle,
        }
    }

    /// Launch the background reaper. Returns `false` if already started.
    pub fn start(&self) -> bool {
        self.lifecycle.start(self.reaper())
    }

    /// A reaper over this engine's tables, configured from `[reaper]`.
    pub fn reaper(&self) -> Reaper {
        let section = self.config.reaper();
        Reaper::new(
            self.registry.clone(),
            self.locks.clone(),
            section.interval(),
            section.retention(),
        )
    }

    pub fn submit(&self, request: SubmitRequest) -> Result<JobId> {
        self.dispatcher.submit(request)
    }

    pub fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        self.dispatcher.status(job_id)
    }

    /// Wait until the job reaches a terminal state and return its status.
    pub async fn wait(&self, job_id: &JobId) -> Result<JobStatus> {
        let record = self
            .registry
            .get(job_id)
            .ok_or_else(|| DispatchError::JobNotFound(job_id.to_string()))?;
        record.completion().wait().await;
        Ok(JobStatus::from_record(&record))
    }

    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lifecycle.is_shutting_down()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.lifecycle.shutdown_token()
    }

    pub fn in_flight(&self) -> usize {
        self.lifecycle.in_flight()
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &TargetLocks {
        &self.locks
    }
}
