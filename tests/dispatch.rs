// tests/dispatch.rs

use std::error::Error;
use std::sync::Arc;

use playbook_dispatch::engine::{JobEngine, SubmitRequest};
use playbook_dispatch::errors::{DispatchError, ValidationError};
use playbook_dispatch::types::JobState;
use playbook_dispatch_test_utils::builders::ConfigFileBuilder;
use playbook_dispatch_test_utils::fake_runner::FakeRunner;
use playbook_dispatch_test_utils::{eventually, init_tracing, with_timeout};
use serde_json::json;
use tokio::sync::Barrier;

type TestResult = Result<(), Box<dyn Error>>;

fn engine_with(runner: &FakeRunner) -> JobEngine {
    JobEngine::new(ConfigFileBuilder::new().build(), Arc::new(runner.clone()))
}

#[tokio::test]
async fn busy_target_is_denied_until_its_job_completes() -> TestResult {
    init_tracing();

    let (runner, gate) = FakeRunner::succeeding("PLAY RECAP ok=1").gated();
    let engine = engine_with(&runner);

    let first = engine.submit(SubmitRequest::new("node1", "ipcheck"))?;
    let status = engine.status(&first)?;
    assert_eq!(status.status, JobState::Running);
    assert_eq!(status.target, "node1");
    assert_eq!(status.tag, "ipcheck");
    assert!(status.return_code.is_none());

    match engine.submit(SubmitRequest::new("node1", "ipcheck")) {
        Err(DispatchError::AdmissionDenied(denied)) => {
            assert_eq!(denied.target, "node1");
            assert_eq!(denied.job_id, first);
            assert_eq!(denied.tag, "ipcheck");
            assert_eq!(denied.started_at, Some(status.started_at));
        }
        other => panic!("expected admission denial, got {other:?}"),
    }
    // The denied submission left nothing behind.
    assert_eq!(engine.registry().len(), 1);

    gate.release_one();
    let done = with_timeout(engine.wait(&first)).await?;
    assert_eq!(done.status, JobState::Completed);
    assert_eq!(done.return_code, Some(0));
    assert_eq!(done.output.as_deref(), Some("PLAY RECAP ok=1"));
    assert!(done.completed_at.is_some());

    // Once the runner has released the target, a new job is admitted.
    eventually(|| !engine.locks().is_locked("node1")).await;
    gate.release_one();
    let second = engine.submit(SubmitRequest::new("node1", "ipcheck"))?;
    assert_ne!(second, first);

    with_timeout(engine.wait(&second)).await?;
    assert_eq!(runner.invocation_count(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_for_one_target_admit_exactly_one() -> TestResult {
    init_tracing();
    const CONTENDERS: usize = 16;

    let (runner, gate) = FakeRunner::succeeding("").gated();
    let engine = Arc::new(engine_with(&runner));
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                engine.submit(SubmitRequest::new("node1", "ipcheck"))
            })
        })
        .collect();

    let mut admitted = Vec::new();
    let mut denied = Vec::new();
    for handle in handles {
        match handle.await? {
            Ok(job_id) => admitted.push(job_id),
            Err(DispatchError::AdmissionDenied(d)) => denied.push(d),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(admitted.len(), 1);
    assert_eq!(denied.len(), CONTENDERS - 1);
    let winner = admitted[0];
    assert!(denied.iter().all(|d| d.job_id == winner));
    assert_eq!(engine.registry().len(), 1);
    assert_eq!(engine.locks().peek("node1").map(|h| h.job_id), Some(winner));

    gate.release_one();
    with_timeout(engine.wait(&winner)).await?;
    assert_eq!(runner.invocation_count(), 1);
    Ok(())
}

#[tokio::test]
async fn different_targets_run_in_parallel() -> TestResult {
    init_tracing();

    let (runner, gate) = FakeRunner::succeeding("").gated();
    let config = ConfigFileBuilder::new()
        .with_target("node2")
        .with_target("node3")
        .build();
    let engine = JobEngine::new(config, Arc::new(runner.clone()));

    let ids = [
        engine.submit(SubmitRequest::new("node1", "ipcheck"))?,
        engine.submit(SubmitRequest::new("node2", "ipcheck"))?,
        engine.submit(SubmitRequest::new("node3", "ipcheck"))?,
    ];

    // All three reach the process runner while none has finished.
    eventually(|| runner.invocation_count() == 3).await;
    for id in &ids {
        assert!(engine.status(id)?.is_running());
    }

    gate.release(3);
    for id in &ids {
        assert_eq!(with_timeout(engine.wait(id)).await?.status, JobState::Completed);
    }
    Ok(())
}

#[tokio::test]
async fn rejected_submissions_leave_no_record_or_lock() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding("");
    let engine = engine_with(&runner);

    let cases = [
        (
            SubmitRequest::new("node1", "reboot"),
            ValidationError::UnknownTag("reboot".into()),
        ),
        (
            SubmitRequest::new("db1", "ipcheck"),
            ValidationError::UnknownTarget("db1".into()),
        ),
        (
            SubmitRequest::new("node1", "ipcheck").with_playbook("flux"),
            ValidationError::UnknownPlaybook("flux".into()),
        ),
        (
            SubmitRequest::new("node1", "ipcheck").with_parameters(json!("a=1")),
            ValidationError::MalformedParameters("a string".into()),
        ),
        (
            SubmitRequest::new("node1", "ipcheck").with_parameters(json!([1, 2])),
            ValidationError::MalformedParameters("an array".into()),
        ),
    ];

    for (request, expected) in cases {
        match engine.submit(request) {
            Err(DispatchError::Validation(err)) => assert_eq!(err, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
    }

    assert!(engine.registry().is_empty());
    assert!(engine.locks().is_empty());
    assert_eq!(engine.in_flight(), 0);
    assert_eq!(runner.invocation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn invocation_carries_playbook_target_tag_and_parameters() -> TestResult {
    init_tracing();

    let runner = FakeRunner::succeeding("");
    let config = ConfigFileBuilder::new()
        .with_playbook("ssh", "playbooks/ssh.yml")
        .default_playbook("main")
        .with_tag("common")
        .executable("/usr/bin/ansible-playbook")
        .working_dir("/srv/ansible")
        .build();
    let engine = JobEngine::new(config, Arc::new(runner.clone()));

    let plain = engine.submit(SubmitRequest::new("node1", "ipcheck"))?;
    with_timeout(engine.wait(&plain)).await?;
    eventually(|| !engine.locks().is_locked("node1")).await;

    let with_vars = engine.submit(
        SubmitRequest::new("node1", "common")
            .with_playbook("ssh")
            .with_parameters(json!({ "user": "deploy" })),
    )?;
    let status = with_timeout(engine.wait(&with_vars)).await?;
    assert_eq!(status.playbook, "ssh");

    let invocations = runner.invocations();
    let invocations = invocations.lock().unwrap();
    assert_eq!(invocations.len(), 2);

    assert_eq!(invocations[0].executable, "/usr/bin/ansible-playbook");
    assert_eq!(invocations[0].working_dir.to_str(), Some("/srv/ansible"));
    assert_eq!(invocations[0].args, ["main.yml", "-l", "node1", "-t", "ipcheck"]);

    assert_eq!(
        invocations[1].args,
        [
            "playbooks/ssh.yml",
            "-l",
            "node1",
            "-t",
            "common",
            "--extra-vars",
            r#"{"user":"deploy"}"#,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn status_of_unknown_job_is_not_found() -> TestResult {
    init_tracing();

    let engine = engine_with(&FakeRunner::succeeding(""));
    let missing = playbook_dispatch::types::JobId::new();

    match engine.status(&missing) {
        Err(DispatchError::JobNotFound(id)) => assert_eq!(id, missing.to_string()),
        other => panic!("expected JobNotFound, got {other:?}"),
    }
    assert!(matches!(
        engine.wait(&missing).await,
        Err(DispatchError::JobNotFound(_))
    ));
    Ok(())
}
