// src/exec/ansible.rs

//! Production process runner.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::backend::{Invocation, ProcessOutput, ProcessRunner};

/// Runs invocations as real child processes.
///
/// The working directory is set on the child only; the dispatcher's own
/// current directory never changes, so concurrent jobs cannot race on it.
/// Children are not killed when the job's future is dropped: once started,
/// a playbook run is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct AnsiblePlaybookRunner;

impl AnsiblePlaybookRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for AnsiblePlaybookRunner {
    fn run(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        Box::pin(run_process(invocation))
    }
}

async fn run_process(invocation: Invocation) -> Result<ProcessOutput> {
    info!(
        executable = %invocation.executable,
        working_dir = ?invocation.working_dir,
        args = ?invocation.args,
        "starting playbook process"
    );

    let output = Command::new(&invocation.executable)
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| {
            format!(
                "launching '{}' in {:?}",
                invocation.executable, invocation.working_dir
            )
        })?;

    // `None` means the child was terminated by a signal.
    let return_code = output.status.code().unwrap_or(-1);

    debug!(
        executable = %invocation.executable,
        return_code,
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "playbook process exited"
    );

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        return_code,
    })
}
