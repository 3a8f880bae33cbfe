// src/engine/lifecycle.rs

//! Startup and shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::engine::reaper::Reaper;

/// Owns the shutdown token and the trackers for every background task.
///
/// - `start` launches the reaper, once.
/// - `shutdown` stops the reaper's pending ticks, waits for every execution
///   runner, then waits for the reaper itself. Calling it again (or from
///   several places at once) waits for the same completion and returns.
///
/// In-flight jobs are never cancelled; shutdown only waits for them.
#[derive(Debug, Default)]
pub struct Lifecycle {
    shutdown: CancellationToken,
    runners: TaskTracker,
    reaper: TaskTracker,
    started: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Tracker execution runners must be spawned on.
    pub fn runners(&self) -> TaskTracker {
        self.runners.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of execution runners still in flight.
    pub fn in_flight(&self) -> usize {
        self.runners.len()
    }

    /// Spawn the reaper. Returns `false` if it was already started or
    /// shutdown has begun.
    pub fn start(&self, reaper: Reaper) -> bool {
        if self.shutdown.is_cancelled() {
            debug!("not starting reaper: shutdown already requested");
            return false;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("reaper already started");
            return false;
        }

        info!("starting reaper");
        self.reaper.spawn(reaper.run(self.shutdown.clone()));
        true
    }

    pub async fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!(in_flight = self.runners.len(), "shutting down; waiting for running jobs");
        }
        self.shutdown.cancel();

        self.runners.close();
        self.runners.wait().await;
        debug!("all execution runners finished");

        self.reaper.close();
        self.reaper.wait().await;
        debug!("reaper finished");
    }
}
