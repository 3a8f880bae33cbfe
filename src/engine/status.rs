// src/engine/status.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::exec::describe_return_code;
use crate::jobs::{JobRecord, Outcome};
use crate::types::{JobId, JobState};

/// Snapshot of one job as reported to callers.
///
/// Result fields are only present once the job is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub job_id: JobId,
    pub status: JobState,
    pub target: String,
    pub tag: String,
    pub playbook: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_code_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<JobId>,
}

impl JobStatus {
    pub fn from_record(record: &JobRecord) -> Self {
        let mut status = Self {
            job_id: record.job_id,
            status: record.state(),
            target: record.target.clone(),
            tag: record.tag.clone(),
            playbook: record.playbook.clone(),
            started_at: record.created_at,
            completed_at: None,
            output: None,
            error: None,
            return_code: None,
            return_code_message: None,
            superseded_by: None,
        };

        if let Some(completion) = record.completion().get() {
            status.completed_at = Some(completion.completed_at);
            match &completion.outcome {
                Outcome::Finished(result) => {
                    status.output = Some(result.output.clone());
                    status.error = Some(result.error.clone());
                    status.return_code = Some(result.return_code);
                    status.return_code_message = Some(
                        describe_return_code(result.return_code)
                            .unwrap_or("Unrecognised return code")
                            .to_string(),
                    );
                }
                Outcome::Superseded { by } => {
                    status.superseded_by = Some(*by);
                }
            }
        }

        status
    }

    pub fn is_running(&self) -> bool {
        self.status == JobState::Running
    }
}
