// src/exec/backend.rs

//! Pluggable process runner abstraction.
//!
//! The execution runner never spawns processes itself; it builds an
//! [`Invocation`] and hands it to a `ProcessRunner`.
//!
//! - `AnsiblePlaybookRunner` is the production implementation.
//! - Tests provide their own runner that records invocations and returns
//!   scripted output without touching the OS.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::jobs::JobRecord;

/// One fully-resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: String,
    pub working_dir: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Build the `ansible-playbook` command line for a job:
    /// `<playbook> -l <target> -t <tag> [--extra-vars <json>]`.
    pub fn for_job(executable: &str, working_dir: &Path, record: &JobRecord) -> Self {
        let mut args = vec![
            record.playbook_path.to_string_lossy().into_owned(),
            "-l".to_string(),
            record.target.clone(),
            "-t".to_string(),
            record.tag.clone(),
        ];

        if let Some(extra_vars) = extra_vars_arg(&record.parameters) {
            args.push("--extra-vars".to_string());
            args.push(extra_vars);
        }

        Self {
            executable: executable.to_string(),
            working_dir: working_dir.to_path_buf(),
            args,
        }
    }
}

fn extra_vars_arg(parameters: &Map<String, Value>) -> Option<String> {
    if parameters.is_empty() {
        return None;
    }
    // Serializing a map of `Value`s cannot fail.
    Some(Value::Object(parameters.clone()).to_string())
}

/// Captured result of a process that was launched and exited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
}

/// Trait abstracting how an invocation is executed.
///
/// Returns `Err` only when the process could not be run at all (missing
/// executable, bad working directory, ...). A process that ran and exited
/// non-zero is an `Ok` with that return code.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProcessOutput>> + Send + '_>>;
}

impl From<ProcessOutput> for crate::jobs::JobResult {
    fn from(output: ProcessOutput) -> Self {
        Self {
            output: output.stdout,
            error: output.stderr,
            return_code: output.return_code,
        }
    }
}
