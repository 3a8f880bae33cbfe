// src/engine/mod.rs

//! Job dispatch and tracking engine.
//!
//! - [`dispatcher`]: validation, admission and spawning (`submit`/`status`).
//! - [`runner`]: runs one job's process and publishes its outcome once.
//! - [`reaper`]: periodic eviction of old jobs and fallback lock release.
//! - [`lifecycle`]: starts the reaper and coordinates shutdown.
//! - [`status`]: the serializable view of a job returned to callers.
//! - [`service`]: `JobEngine`, the facade the binary and tests use.

pub mod dispatcher;
pub mod lifecycle;
pub mod reaper;
pub mod runner;
pub mod service;
pub mod status;

pub use dispatcher::{Dispatcher, SubmitRequest};
pub use lifecycle::Lifecycle;
pub use reaper::{Reaper, SweepReport};
pub use runner::ExecutionRunner;
pub use service::JobEngine;
pub use status::JobStatus;
