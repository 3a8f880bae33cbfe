// tests/lifecycle.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use playbook_dispatch::engine::{JobEngine, SubmitRequest};
use playbook_dispatch::errors::DispatchError;
use playbook_dispatch::types::JobState;
use playbook_dispatch_test_utils::builders::ConfigFileBuilder;
use playbook_dispatch_test_utils::fake_runner::FakeRunner;
use playbook_dispatch_test_utils::{eventually, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn shutdown_waits_for_running_jobs() -> TestResult {
    init_tracing();

    let (runner, gate) = FakeRunner::succeeding("done").gated();
    let config = ConfigFileBuilder::new().with_target("node2").build();
    let engine = Arc::new(JobEngine::new(config, Arc::new(runner.clone())));
    assert!(engine.start());

    let a = engine.submit(SubmitRequest::new("node1", "ipcheck"))?;
    let b = engine.submit(SubmitRequest::new("node2", "ipcheck"))?;
    eventually(|| runner.invocation_count() == 2).await;
    assert_eq!(engine.in_flight(), 2);

    let shutting_down = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.shutdown().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!shutting_down.is_finished());
    assert!(engine.status(&a)?.is_running());
    assert!(engine.status(&b)?.is_running());

    // No new work while draining.
    assert!(matches!(
        engine.submit(SubmitRequest::new("node1", "ipcheck")),
        Err(DispatchError::ShuttingDown)
    ));

    gate.release(2);
    with_timeout(shutting_down).await?;

    assert_eq!(engine.in_flight(), 0);
    assert_eq!(engine.status(&a)?.status, JobState::Completed);
    assert_eq!(engine.status(&b)?.status, JobState::Completed);
    assert!(engine.locks().is_empty());
    Ok(())
}

#[tokio::test]
async fn submit_after_shutdown_records_nothing() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding("");
    let engine = JobEngine::new(ConfigFileBuilder::new().build(), Arc::new(runner.clone()));
    with_timeout(engine.shutdown()).await;

    match engine.submit(SubmitRequest::new("node1", "ipcheck")) {
        Err(DispatchError::ShuttingDown) => {}
        other => panic!("expected ShuttingDown, got {other:?}"),
    }
    assert!(engine.registry().is_empty());
    assert!(engine.locks().is_empty());
    assert_eq!(runner.invocation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_is_idempotent_and_safe_to_call_concurrently() -> TestResult {
    init_tracing();

    let (runner, gate) = FakeRunner::succeeding("").gated();
    let engine = JobEngine::new(ConfigFileBuilder::new().build(), Arc::new(runner));
    engine.start();
    let job = engine.submit(SubmitRequest::new("node1", "ipcheck"))?;

    gate.release_one();
    with_timeout(async { tokio::join!(engine.shutdown(), engine.shutdown()) }).await;
    with_timeout(engine.shutdown()).await;

    assert_eq!(engine.status(&job)?.status, JobState::Completed);
    Ok(())
}

#[tokio::test]
async fn reaper_starts_once_and_not_after_shutdown() -> TestResult {
    init_tracing();

    let engine = JobEngine::new(
        ConfigFileBuilder::new().build(),
        Arc::new(FakeRunner::succeeding("")),
    );
    assert!(engine.start());
    assert!(!engine.start());
    with_timeout(engine.shutdown()).await;

    let late = JobEngine::new(
        ConfigFileBuilder::new().build(),
        Arc::new(FakeRunner::succeeding("")),
    );
    with_timeout(late.shutdown()).await;
    assert!(!late.start());
    Ok(())
}

#[tokio::test]
async fn shutdown_token_reflects_state() -> TestResult {
    init_tracing();

    let engine = JobEngine::new(
        ConfigFileBuilder::new().build(),
        Arc::new(FakeRunner::succeeding("")),
    );
    let token = engine.shutdown_token();
    assert!(!token.is_cancelled());
    assert!(!engine.is_shutting_down());

    with_timeout(engine.shutdown()).await;
    assert!(token.is_cancelled());
    assert!(engine.is_shutting_down());
    Ok(())
}
