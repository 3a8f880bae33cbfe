// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `ProcessRunner` trait the execution runner talks
//!   to, plus the `Invocation`/`ProcessOutput` types crossing it. Tests swap
//!   in a fake runner here.
//! - [`ansible`] is the production runner, spawning `ansible-playbook` via
//!   `tokio::process::Command`.
//! - [`return_codes`] maps exit codes to human-readable descriptions.

pub mod ansible;
pub mod backend;
pub mod return_codes;

pub use ansible::AnsiblePlaybookRunner;
pub use backend::{Invocation, ProcessOutput, ProcessRunner};
pub use return_codes::describe_return_code;
