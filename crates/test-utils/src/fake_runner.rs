use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use playbook_dispatch::exec::{Invocation, ProcessOutput, ProcessRunner};

/// What the fake process does once it is allowed to finish.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Exit with the given output and return code.
    Exit(ProcessOutput),
    /// Fail to launch with the given message.
    LaunchError(String),
    /// Panic inside the runner.
    Panic,
}

/// Releases jobs held by a gated [`FakeRunner`].
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let one held (or future) invocation finish.
    pub fn release_one(&self) {
        self.permits.add_permits(1);
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// A fake process runner that:
/// - records every invocation it receives
/// - optionally blocks each invocation until its [`Gate`] releases it
/// - then behaves as configured (exit, launch error, panic).
#[derive(Debug, Clone)]
pub struct FakeRunner {
    behaviour: FakeBehaviour,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeRunner {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            invocations: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Exits 0 with `stdout` as output.
    pub fn succeeding(stdout: &str) -> Self {
        Self::exiting(stdout, "", 0)
    }

    pub fn exiting(stdout: &str, stderr: &str, return_code: i32) -> Self {
        Self::new(FakeBehaviour::Exit(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            return_code,
        }))
    }

    pub fn failing_to_launch(msg: &str) -> Self {
        Self::new(FakeBehaviour::LaunchError(msg.to_string()))
    }

    pub fn panicking() -> Self {
        Self::new(FakeBehaviour::Panic)
    }

    /// Hold every invocation until the returned gate releases it.
    pub fn gated(mut self) -> (Self, Gate) {
        let permits = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&permits));
        (self, Gate { permits })
    }

    /// Handle onto the recorded invocations, shared with clones.
    pub fn invocations(&self) -> Arc<Mutex<Vec<Invocation>>> {
        Arc::clone(&self.invocations)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProcessOutput>> + Send + '_>> {
        self.invocations.lock().unwrap().push(invocation);

        Box::pin(async move {
            if let Some(gate) = &self.gate {
                gate.acquire().await?.forget();
            }

            match &self.behaviour {
                FakeBehaviour::Exit(output) => Ok(output.clone()),
                FakeBehaviour::LaunchError(msg) => Err(anyhow::anyhow!(msg.clone())),
                FakeBehaviour::Panic => panic!("fake runner panicked"),
            }
        })
    }
}
