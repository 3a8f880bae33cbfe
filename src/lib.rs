// src/lib.rs

pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod jobs;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, verify_paths, ConfigFile};
use crate::engine::JobEngine;
use crate::exec::AnsiblePlaybookRunner;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and path verification
/// - the job engine with the real `ansible-playbook` runner
/// - the reaper
/// - the stdin/stdout control channel
/// - Ctrl-C handling and graceful shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    verify_paths(&cfg)?;

    if args.check {
        print_check(&cfg);
        return Ok(());
    }

    let engine = JobEngine::new(cfg, Arc::new(AnsiblePlaybookRunner::new()));
    engine.start();

    // Ctrl-C ends the control session; shutdown then waits for running jobs.
    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            stop.cancel();
        });
    }

    let served = control::serve(
        &engine,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        stop,
    )
    .await;

    engine.shutdown().await;
    info!("playbook-dispatch exiting");

    served.map_err(anyhow::Error::from)
}

/// Summary printed by `--check`.
fn print_check(cfg: &ConfigFile) {
    println!("playbook-dispatch config check");
    println!("  dispatch.working_dir = {:?}", cfg.working_dir());
    println!("  dispatch.executable = {}", cfg.executable());
    println!("  dispatch.allowed_tags = {:?}", cfg.dispatch().allowed_tags);
    println!("  dispatch.allowed_targets = {:?}", cfg.dispatch().allowed_targets);
    println!("  reaper.interval_secs = {}", cfg.reaper().interval_secs);
    println!("  reaper.retention_secs = {}", cfg.reaper().retention_secs);
    println!();

    println!("playbooks ({}):", cfg.playbooks().len());
    for (name, playbook) in cfg.playbooks() {
        let marker = if name == cfg.default_playbook() { " (default)" } else { "" };
        println!("  - {name}{marker}: {:?}", playbook.path);
    }

    debug!("config check complete (nothing served)");
}
