// src/control/protocol.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{JobStatus, SubmitRequest};
use crate::errors::DispatchError;
use crate::types::JobId;

/// One request line.
///
/// ```json
/// {"op": "submit", "pattern": "node1", "tags": "ipcheck"}
/// {"op": "status", "job_id": "5e0c..."}
/// {"op": "shutdown"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Submit(SubmitRequest),
    Status { job_id: String },
    Shutdown,
}

/// One response line. Every variant carries its own `status` or `error`
/// field, so the wire form stays flat.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Started(Started),
    Busy(Busy),
    Job(JobStatus),
    Stopping(Stopping),
    Error(ErrorReply),
}

#[derive(Debug, Clone, Serialize)]
pub struct Started {
    pub status: &'static str,
    pub message: &'static str,
    pub job_id: JobId,
    pub target: String,
    pub tag: String,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Busy {
    pub status: &'static str,
    pub message: &'static str,
    pub job_id: JobId,
    pub tag: String,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stopping {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub error: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Validation,
    NotFound,
    ShuttingDown,
    Internal,
}

impl Response {
    pub fn started(
        job_id: JobId,
        target: String,
        tag: String,
        started_at: Option<DateTime<Utc>>,
    ) -> Self {
        Response::Started(Started {
            status: "started",
            message: "Playbook execution started.",
            job_id,
            target,
            tag,
            started_at,
        })
    }

    pub fn stopping() -> Self {
        Response::Stopping(Stopping { status: "stopping" })
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Response::Error(ErrorReply {
            error: msg.into(),
            kind: ErrorKind::BadRequest,
        })
    }
}

impl From<DispatchError> for Response {
    fn from(err: DispatchError) -> Self {
        let kind = match &err {
            DispatchError::AdmissionDenied(denied) => {
                return Response::Busy(Busy {
                    status: "failed",
                    message: "Target is busy executing another job",
                    job_id: denied.job_id,
                    tag: denied.tag.clone(),
                    started_at: denied.started_at,
                });
            }
            DispatchError::Validation(_) => ErrorKind::Validation,
            DispatchError::JobNotFound(_) => ErrorKind::NotFound,
            DispatchError::ShuttingDown => ErrorKind::ShuttingDown,
            DispatchError::JsonError(_) => ErrorKind::BadRequest,
            _ => ErrorKind::Internal,
        };
        Response::Error(ErrorReply {
            error: err.to_string(),
            kind,
        })
    }
}
