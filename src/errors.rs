// src/errors.rs

//! Crate-wide error type and the domain errors surfaced by `submit`/`status`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::JobId;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    AdmissionDenied(#[from] AdmissionDenied),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("dispatcher is shutting down; no new jobs accepted")]
    ShuttingDown,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A submission rejected before any job record or target lock exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tag '{0}' is not whitelisted")]
    UnknownTag(String),

    #[error("target '{0}' is not whitelisted")]
    UnknownTarget(String),

    #[error("playbook '{0}' is not configured")]
    UnknownPlaybook(String),

    #[error("parameters must be a JSON object (got {0})")]
    MalformedParameters(String),
}

/// The target already has an admitted job; carries enough about the blocking
/// job for the caller to poll it instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("target '{target}' is busy executing job {job_id} (tag '{tag}')")]
pub struct AdmissionDenied {
    pub target: String,
    pub job_id: JobId,
    pub tag: String,
    /// `None` when the holder's record is not (or no longer) in the registry.
    pub started_at: Option<DateTime<Utc>>,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DispatchError>;
