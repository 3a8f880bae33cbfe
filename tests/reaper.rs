// tests/reaper.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use playbook_dispatch::engine::{JobEngine, Reaper};
use playbook_dispatch::jobs::{JobRecord, JobRegistry, JobResult, TargetLocks};
use playbook_dispatch::types::JobId;
use playbook_dispatch_test_utils::builders::ConfigFileBuilder;
use playbook_dispatch_test_utils::fake_runner::FakeRunner;
use playbook_dispatch_test_utils::{eventually, init_tracing, with_timeout};
use serde_json::Map;

type TestResult = Result<(), Box<dyn Error>>;

const RETENTION: Duration = Duration::from_secs(3600);

fn record(target: &str) -> Arc<JobRecord> {
    Arc::new(JobRecord::new(
        JobId::new(),
        target,
        "ipcheck",
        "main",
        "main.yml",
        Map::new(),
    ))
}

fn ok() -> JobResult {
    JobResult {
        output: "ok".into(),
        error: String::new(),
        return_code: 0,
    }
}

fn reaper(registry: &JobRegistry, locks: &TargetLocks) -> Reaper {
    Reaper::new(
        registry.clone(),
        locks.clone(),
        Duration::from_secs(10),
        RETENTION,
    )
}

#[test]
fn evicts_only_completed_jobs_past_retention() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();
    let now = Utc::now();

    let old = record("node1");
    old.finish_at(ok(), now - TimeDelta::hours(2));
    let young = record("node2");
    young.finish_at(ok(), now - TimeDelta::minutes(10));
    let running = record("node3");

    for r in [&old, &young, &running] {
        registry.put(Arc::clone(r));
    }

    let report = reaper(&registry, &locks).sweep_at(now);

    assert_eq!(report.evicted, vec![old.job_id]);
    assert!(report.released.is_empty());
    assert!(!registry.contains(&old.job_id));
    assert!(registry.contains(&young.job_id));
    assert!(registry.contains(&running.job_id));
}

#[test]
fn running_jobs_are_never_evicted_however_old() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();

    let running = record("node1");
    registry.put(Arc::clone(&running));
    locks.try_acquire("node1", running.job_id, "ipcheck");

    let report = reaper(&registry, &locks).sweep_at(Utc::now() + TimeDelta::days(30));

    assert!(report.is_empty());
    assert!(registry.contains(&running.job_id));
    assert!(locks.is_locked("node1"));
}

#[test]
fn releases_locks_left_behind_by_completed_jobs() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();
    let now = Utc::now();

    // Completed but its runner never released the target.
    let stale = record("node1");
    stale.finish_at(ok(), now - TimeDelta::seconds(5));
    registry.put(Arc::clone(&stale));
    locks.try_acquire("node1", stale.job_id, "ipcheck");

    let live = record("node2");
    registry.put(Arc::clone(&live));
    locks.try_acquire("node2", live.job_id, "ipcheck");

    let report = reaper(&registry, &locks).sweep_at(now);

    assert!(report.evicted.is_empty());
    assert_eq!(report.released, vec!["node1".to_string()]);
    assert!(!locks.is_locked("node1"));
    assert!(locks.is_locked("node2"));
    // Still queryable until retention passes.
    assert!(registry.contains(&stale.job_id));
}

#[test]
fn evicting_a_lock_holder_also_releases_its_target() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();
    let now = Utc::now();

    let stale = record("node1");
    stale.finish_at(ok(), now - TimeDelta::hours(3));
    registry.put(Arc::clone(&stale));
    locks.try_acquire("node1", stale.job_id, "ipcheck");

    let report = reaper(&registry, &locks).sweep_at(now);

    assert_eq!(report.evicted, vec![stale.job_id]);
    assert_eq!(report.released, vec!["node1".to_string()]);
    assert!(registry.is_empty());
    assert!(locks.is_empty());
}

#[test]
fn locks_of_unknown_jobs_are_left_alone() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();
    locks.try_acquire("node1", JobId::new(), "ipcheck");

    let report = reaper(&registry, &locks).sweep_at(Utc::now());

    assert!(report.is_empty());
    assert!(locks.is_locked("node1"));
}

#[test]
fn superseded_jobs_age_out_like_completed_ones() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();

    let superseded = record("node1");
    superseded.supersede(JobId::new());
    registry.put(Arc::clone(&superseded));

    let report = reaper(&registry, &locks).sweep_at(Utc::now() + TimeDelta::hours(2));
    assert_eq!(report.evicted, vec![superseded.job_id]);
}

#[test]
fn second_sweep_finds_nothing() {
    init_tracing();
    let registry = JobRegistry::new();
    let locks = TargetLocks::new();
    let now = Utc::now();

    let old = record("node1");
    old.finish_at(ok(), now - TimeDelta::hours(2));
    registry.put(Arc::clone(&old));
    locks.try_acquire("node1", old.job_id, "ipcheck");

    let reaper = reaper(&registry, &locks);
    assert!(!reaper.sweep_at(now).is_empty());
    assert!(reaper.sweep_at(now).is_empty());
}

#[tokio::test]
async fn background_reaper_releases_stale_locks_and_stops_on_shutdown() -> TestResult {
    init_tracing();

    let config = ConfigFileBuilder::new().reaper(1, 3600).build();
    let engine = JobEngine::new(config, Arc::new(FakeRunner::succeeding("")));

    let stale = record("node1");
    stale.finish(ok());
    engine.registry().put(Arc::clone(&stale));
    engine.locks().try_acquire("node1", stale.job_id, "ipcheck");

    assert!(engine.start());
    eventually(|| !engine.locks().is_locked("node1")).await;
    assert!(engine.registry().contains(&stale.job_id));

    with_timeout(engine.shutdown()).await;
    Ok(())
}
