// src/jobs/record.rs

//! The job record and its one-shot completion signal.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::types::{JobId, JobState};

/// Output of one playbook run, as stored on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub output: String,
    pub error: String,
    pub return_code: i32,
}

impl JobResult {
    /// Return code recorded when the process could not be launched at all.
    pub const LAUNCH_FAILURE_RC: i32 = -1;

    pub fn launch_failure(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: error.into(),
            return_code: Self::LAUNCH_FAILURE_RC,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}

/// How a job reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The runner invoked (or tried to invoke) the process.
    Finished(JobResult),
    /// The runner found the target held by another job and never ran.
    Superseded { by: JobId },
}

/// Everything published when a job reaches a terminal state.
///
/// `completed_at` lives here rather than on the record so that it exists
/// exactly when the signal is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub completed_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl Completion {
    pub fn result(&self) -> Option<&JobResult> {
        match &self.outcome {
            Outcome::Finished(result) => Some(result),
            Outcome::Superseded { .. } => None,
        }
    }
}

/// Write-once completion slot.
///
/// - `set` succeeds for the first caller only; later calls are ignored.
/// - `get`/`is_set` never block.
/// - `wait` suspends until the slot is filled.
///
/// Readers that observe the slot as set also observe the full `Completion`,
/// so a result is never visible half-written.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    slot: OnceLock<Completion>,
    notify: Notify,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the completion. Returns `false` if it was already set.
    pub fn set(&self, completion: Completion) -> bool {
        if self.slot.set(completion).is_err() {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Option<&Completion> {
        self.slot.get()
    }

    pub async fn wait(&self) -> &Completion {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a `set` between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            if let Some(completion) = self.slot.get() {
                return completion;
            }
            notified.await;
        }
    }
}

/// Data held for one dispatched execution.
///
/// Everything except the completion signal is fixed at creation; the
/// signal is written once, by the job's own execution runner.
#[derive(Debug)]
pub struct JobRecord {
    pub job_id: JobId,
    pub target: String,
    pub tag: String,
    /// Configured name of the playbook (e.g. `"flux"`).
    pub playbook: String,
    /// Resolved path passed to the executable.
    pub playbook_path: PathBuf,
    /// Extra variables forwarded with `--extra-vars`.
    pub parameters: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    completion: CompletionSignal,
}

impl JobRecord {
    pub fn new(
        job_id: JobId,
        target: impl Into<String>,
        tag: impl Into<String>,
        playbook: impl Into<String>,
        playbook_path: impl Into<PathBuf>,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            job_id,
            target: target.into(),
            tag: tag.into(),
            playbook: playbook.into(),
            playbook_path: playbook_path.into(),
            parameters,
            created_at: Utc::now(),
            completion: CompletionSignal::new(),
        }
    }

    pub fn completion(&self) -> &CompletionSignal {
        &self.completion
    }

    pub fn is_completed(&self) -> bool {
        self.completion.is_set()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completion.get().map(|c| c.completed_at)
    }

    pub fn state(&self) -> JobState {
        match self.completion.get().map(|c| &c.outcome) {
            None => JobState::Running,
            Some(Outcome::Finished(_)) => JobState::Completed,
            Some(Outcome::Superseded { .. }) => JobState::Superseded,
        }
    }

    /// Publish the result of the run. Returns `false` if the record was
    /// already completed.
    pub fn finish(&self, result: JobResult) -> bool {
        self.finish_at(result, Utc::now())
    }

    pub fn finish_at(&self, result: JobResult, completed_at: DateTime<Utc>) -> bool {
        self.completion.set(Completion {
            completed_at,
            outcome: Outcome::Finished(result),
        })
    }

    /// Mark the record terminal without running, because `by` owns the target.
    pub fn supersede(&self, by: JobId) -> bool {
        self.completion.set(Completion {
            completed_at: Utc::now(),
            outcome: Outcome::Superseded { by },
        })
    }
}
