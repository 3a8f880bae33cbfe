// src/engine/dispatcher.rs

//! Public entry point for new jobs.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::engine::runner::ExecutionRunner;
use crate::engine::status::JobStatus;
use crate::errors::{AdmissionDenied, DispatchError, Result, ValidationError};
use crate::jobs::{JobRecord, JobRegistry, LockHolder, TargetLocks};
use crate::types::JobId;

/// A caller's request to run a playbook against a target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(alias = "pattern")]
    pub target: String,

    #[serde(alias = "tags")]
    pub tag: String,

    /// Playbook name; the configured default when `None`.
    #[serde(default)]
    pub playbook: Option<String>,

    /// Must be a JSON object or null.
    #[serde(default)]
    pub parameters: Value,
}

impl SubmitRequest {
    pub fn new(target: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            tag: tag.into(),
            playbook: None,
            parameters: Value::Null,
        }
    }

    pub fn with_playbook(mut self, playbook: impl Into<String>) -> Self {
        self.playbook = Some(playbook.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A request that passed validation, with the playbook resolved.
#[derive(Debug, Clone)]
struct ValidatedRequest {
    target: String,
    tag: String,
    playbook: String,
    playbook_path: PathBuf,
    parameters: Map<String, Value>,
}

fn validate_request(
    config: &ConfigFile,
    request: SubmitRequest,
) -> std::result::Result<ValidatedRequest, ValidationError> {
    if !config.is_target_allowed(&request.target) {
        return Err(ValidationError::UnknownTarget(request.target));
    }
    if !config.is_tag_allowed(&request.tag) {
        return Err(ValidationError::UnknownTag(request.tag));
    }

    let (playbook, playbook_path) = match config.resolve_playbook(request.playbook.as_deref()) {
        Some((name, path)) => (name.to_string(), path.to_path_buf()),
        None => {
            return Err(ValidationError::UnknownPlaybook(
                request.playbook.unwrap_or_default(),
            ));
        }
    };

    let parameters = match request.parameters {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::MalformedParameters(
                json_kind(&other).to_string(),
            ));
        }
    };

    Ok(ValidatedRequest {
        target: request.target,
        tag: request.tag,
        playbook,
        playbook_path,
        parameters,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validates, admits and launches jobs.
///
/// Cloning yields another handle onto the same registry, lock table and
/// runner tracker.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ConfigFile>,
    registry: JobRegistry,
    locks: TargetLocks,
    runner: ExecutionRunner,
    runners: TaskTracker,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("jobs", &self.registry.len())
            .field("locked_targets", &self.locks.len())
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        config: Arc<ConfigFile>,
        registry: JobRegistry,
        locks: TargetLocks,
        runner: ExecutionRunner,
        runners: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry,
            locks,
            runner,
            runners,
            shutdown,
        }
    }

    /// Admit a new job and start it in the background.
    ///
    /// Returns as soon as the runner is spawned; poll [`status`](Self::status)
    /// for the outcome.
    ///
    /// Errors:
    /// - `Validation` if the target, tag, playbook or parameters are not
    ///   acceptable. Nothing is recorded.
    /// - `AdmissionDenied` if another job holds the target.
    /// - `ShuttingDown` once shutdown has begun.
    pub fn submit(&self, request: SubmitRequest) -> Result<JobId> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }

        let request = validate_request(&self.config, request)?;

        let job_id = JobId::new();
        let record = Arc::new(JobRecord::new(
            job_id,
            request.target,
            request.tag,
            request.playbook,
            request.playbook_path,
            request.parameters,
        ));

        // The record goes in before the lock so that a caller denied because
        // of this job can always look up its start time.
        self.registry.put(Arc::clone(&record));

        if let Err(holder) = self.locks.acquire(&record.target, job_id, &record.tag) {
            self.registry.delete(&job_id);
            debug!(target = %record.target, holder = %holder.job_id, "admission denied");
            return Err(self.denial(&record.target, holder).into());
        }

        let runner = self.runner.clone();
        self.runners.spawn(async move {
            runner.run(job_id).await;
        });

        info!(
            %job_id,
            target = %record.target,
            tag = %record.tag,
            playbook = %record.playbook,
            "job dispatched"
        );

        Ok(job_id)
    }

    /// Report the current state of a job.
    pub fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        self.registry
            .get(job_id)
            .map(|record| JobStatus::from_record(&record))
            .ok_or_else(|| DispatchError::JobNotFound(job_id.to_string()))
    }

    fn denial(&self, target: &str, holder: LockHolder) -> AdmissionDenied {
        let started_at = self.registry.get(&holder.job_id).map(|r| r.created_at);
        AdmissionDenied {
            target: target.to_string(),
            job_id: holder.job_id,
            tag: holder.tag,
            started_at,
        }
    }
}
