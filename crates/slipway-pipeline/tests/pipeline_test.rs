use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use mockall::mock;
use slipway_core::{RegistryCredentials, SlipwayConfig};
use slipway_docker::DockerClient;
use slipway_docker::docker::DockerError;
use slipway_docker::executor::DockerCli;
use slipway_pipeline::smoke::{HealthProbe, ProbeError, SmokeOutcome, wait_for_ready};
use slipway_pipeline::trigger::{self, TriggerDecision};
use slipway_pipeline::{Pipeline, PipelineError, RunContext, RunState};
use tempfile::TempDir;

mock! {
    Cli {}

    impl DockerCli for Cli {
        async fn capture(&self, args: &[String]) -> Result<String, DockerError>;
        async fn authenticate(&self, args: &[String], secret: &[u8]) -> Result<(), DockerError>;
        async fn passthrough(&self, args: &[String]) -> Result<(), DockerError>;
    }
}

mock! {
    Probe {}

    impl HealthProbe for Probe {
        async fn get(&self, url: &str) -> Result<u16, ProbeError>;
    }
}

fn exit_failure() -> DockerError {
    use std::os::unix::process::ExitStatusExt;

    DockerError::ExitFailure {
        command: "buildx build".to_owned(),
        status: std::process::ExitStatus::from_raw(256),
        stderr: "boom".to_owned(),
    }
}

fn connection_refused() -> ProbeError {
    ProbeError::Request {
        detail: "connection refused".to_owned(),
    }
}

/// Config with the readiness poll tuned down so tests run fast.
fn test_config() -> SlipwayConfig {
    let mut config = SlipwayConfig::default();
    config.image.name = Some("hello".to_owned());
    config.smoke.grace_period_ms = 0;
    config.smoke.base_delay_ms = 1;
    config.smoke.max_attempts = 3;
    config
}

fn test_credentials() -> RegistryCredentials {
    RegistryCredentials::from_lookup(|key| match key {
        "DOCKER_USERNAME" => Some("danielt".to_owned()),
        "DOCKER_ACCESS_TOKEN" => Some("dckr_pat_abc123".to_owned()),
        _ => None,
    })
    .unwrap()
}

/// Project dir containing a Dockerfile, as the pipeline requires.
fn project_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Dockerfile"), "FROM scratch\n").unwrap();
    tmp
}

fn run_context(dir: &Path) -> RunContext {
    RunContext {
        project_dir: dir.to_path_buf(),
        short_hash: "a1b2c3d".to_owned(),
    }
}

fn tag_argument(args: &[String]) -> String {
    let at = args.iter().position(|a| a == "-t").unwrap();
    args[at + 1].clone()
}

// ── Scenario A: healthy app → publish runs ──

#[tokio::test]
async fn healthy_run_builds_tests_and_publishes() {
    let mut mock = MockCli::new();
    let builds: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded = builds.clone();
    mock.expect_passthrough()
        .withf(|args| args.contains(&"build".to_owned()))
        .returning(move |args| {
            recorded.lock().unwrap().push(args.to_vec());
            Ok(())
        });

    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));

    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .times(1)
        .returning(|_| Ok(String::new()));

    mock.expect_authenticate()
        .withf(|args, secret| args.contains(&"login".to_owned()) && secret == b"dckr_pat_abc123")
        .times(1)
        .returning(|_, _| Ok(()));

    mock.expect_capture()
        .withf(|args| args.contains(&"logout".to_owned()))
        .times(1)
        .returning(|_| Ok(String::new()));

    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Ok(200));

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let report = pipeline.run(&run_context(dir.path())).await.unwrap();

    assert!(report.published);
    assert_eq!(report.state, RunState::Done);
    assert!(report.state.is_terminal());
    assert_eq!(report.image.repository(), "danielt/hello");

    // Exactly two builds: the single-platform test build, then the
    // multi-platform push, under one identical tag.
    let builds = builds.lock().unwrap();
    assert_eq!(builds.len(), 2);
    assert!(builds[0].contains(&"--load".to_owned()));
    assert!(builds[0].contains(&"linux/amd64".to_owned()));
    assert!(builds[1].contains(&"--push".to_owned()));
    assert!(builds[1].contains(&"linux/amd64,linux/arm64".to_owned()));

    let test_tag = tag_argument(&builds[0]);
    let push_tag = tag_argument(&builds[1]);
    assert_eq!(test_tag, push_tag);
    assert!(test_tag.starts_with("danielt/hello:"));
    assert!(test_tag.ends_with(".a1b2c3d"));
}

// ── Scenario B: unhealthy app → publish never executes ──

#[tokio::test]
async fn unhealthy_smoke_skips_publish_entirely() {
    let mut mock = MockCli::new();

    mock.expect_passthrough()
        .withf(|args| args.contains(&"--load".to_owned()))
        .times(1)
        .returning(|_| Ok(()));

    // The publish build and the registry login must never happen.
    mock.expect_passthrough()
        .withf(|args| args.contains(&"--push".to_owned()))
        .times(0);
    mock.expect_authenticate().times(0);

    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));

    mock.expect_capture()
        .withf(|args| args.contains(&"logs".to_owned()))
        .returning(|_| Ok("error: failed to bind 0.0.0.0:5000\n".to_owned()));

    // Teardown still runs on the failure path.
    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .times(1)
        .returning(|_| Ok(String::new()));

    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Err(connection_refused()));

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let err = pipeline.run(&run_context(dir.path())).await.unwrap_err();

    match err {
        PipelineError::Smoke {
            reason,
            container_logs,
        } => {
            assert!(reason.contains("connection refused"));
            assert!(container_logs.unwrap().contains("failed to bind"));
        }
        other => panic!("expected smoke failure, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_fails_the_run() {
    let mut mock = MockCli::new();

    mock.expect_passthrough()
        .withf(|args| args.contains(&"--load".to_owned()))
        .returning(|_| Ok(()));
    mock.expect_authenticate().times(0);

    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));
    mock.expect_capture()
        .withf(|args| args.contains(&"logs".to_owned()))
        .returning(|_| Ok(String::new()));
    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .returning(|_| Ok(String::new()));

    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Ok(503));

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let err = pipeline.run(&run_context(dir.path())).await.unwrap_err();

    match err {
        PipelineError::Smoke { reason, .. } => {
            assert!(reason.contains("503"));
            assert!(reason.contains("3 attempt(s) exhausted"));
        }
        other => panic!("expected smoke failure, got {other:?}"),
    }
}

// ── Readiness poll: slow startup recovers within the budget ──

#[tokio::test]
async fn slow_startup_recovers_through_backoff() {
    let mut mock = MockCli::new();

    mock.expect_passthrough()
        .withf(|args| args.contains(&"build".to_owned()))
        .times(2)
        .returning(|_| Ok(()));
    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));
    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .returning(|_| Ok(String::new()));
    mock.expect_authenticate().returning(|_, _| Ok(()));
    mock.expect_capture()
        .withf(|args| args.contains(&"logout".to_owned()))
        .returning(|_| Ok(String::new()));

    // Unreachable twice, then ready.
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let mut probe = MockProbe::new();
    probe.expect_get().returning(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(connection_refused())
        } else {
            Ok(200)
        }
    });

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let report = pipeline.run(&run_context(dir.path())).await.unwrap();

    assert!(report.published);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(report.steps.iter().any(|s| s.contains("3 attempt(s)")));
}

// ── Setup failures ──

#[tokio::test]
async fn missing_image_name_fails_before_any_docker_call() {
    let mut config = test_config();
    config.image.name = None;

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(MockCli::new()),
        MockProbe::new(),
        config,
        test_credentials(),
    );
    let err = pipeline.run(&run_context(dir.path())).await.unwrap_err();

    assert!(matches!(err, PipelineError::Setup { .. }));
    assert!(err.to_string().contains("IMAGE_NAME"));
}

#[tokio::test]
async fn missing_dockerfile_fails_before_any_docker_call() {
    let tmp = TempDir::new().unwrap();

    let pipeline = Pipeline::new(
        DockerClient::with_cli(MockCli::new()),
        MockProbe::new(),
        test_config(),
        test_credentials(),
    );
    let err = pipeline.run(&run_context(tmp.path())).await.unwrap_err();

    match err {
        PipelineError::Setup { reason } => assert!(reason.contains("Dockerfile")),
        other => panic!("expected setup failure, got {other:?}"),
    }
}

// ── Publish-stage failures ──

#[tokio::test]
async fn push_failure_fails_the_run_without_logout() {
    let mut mock = MockCli::new();

    mock.expect_passthrough()
        .withf(|args| args.contains(&"--load".to_owned()))
        .returning(|_| Ok(()));
    mock.expect_passthrough()
        .withf(|args| args.contains(&"--push".to_owned()))
        .returning(|_| Err(exit_failure()));

    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));
    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .returning(|_| Ok(String::new()));
    mock.expect_authenticate().returning(|_, _| Ok(()));

    // Fail-fast: the push failure ends the run before teardown of
    // credentials, exactly like the sequential step flow it mirrors.
    mock.expect_capture()
        .withf(|args| args.contains(&"logout".to_owned()))
        .times(0);

    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Ok(200));

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let err = pipeline.run(&run_context(dir.path())).await.unwrap_err();

    assert!(matches!(err, PipelineError::Publish { .. }));
}

// ── Smoke-only mode ──

#[tokio::test]
async fn smoke_only_never_touches_the_registry() {
    let mut mock = MockCli::new();

    mock.expect_passthrough()
        .withf(|args| args.contains(&"--load".to_owned()))
        .times(1)
        .returning(|_| Ok(()));
    mock.expect_passthrough()
        .withf(|args| args.contains(&"--push".to_owned()))
        .times(0);
    mock.expect_authenticate().times(0);

    mock.expect_capture()
        .withf(|args| args.contains(&"run".to_owned()))
        .returning(|_| Ok("f2d9ab1c44e0\n".to_owned()));
    mock.expect_capture()
        .withf(|args| args.contains(&"rm".to_owned()))
        .returning(|_| Ok(String::new()));

    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Ok(200));

    let dir = project_dir();
    let pipeline = Pipeline::new(
        DockerClient::with_cli(mock),
        probe,
        test_config(),
        test_credentials(),
    );
    let report = pipeline.smoke_only(&run_context(dir.path())).await.unwrap();

    assert!(!report.published);
    assert_eq!(report.state, RunState::TestOk);
}

// ── Trigger gate (Scenario C) ──

#[test]
fn push_to_configured_branch_triggers() {
    assert_eq!(trigger::evaluate("main", "main"), TriggerDecision::Proceed);
}

#[test]
fn push_to_other_branch_does_not_trigger() {
    assert_eq!(
        trigger::evaluate("feature/x", "main"),
        TriggerDecision::Skip {
            branch: "feature/x".to_owned()
        }
    );
}

// ── Readiness poll unit behavior ──

#[tokio::test]
async fn first_success_ends_the_poll() {
    let mut probe = MockProbe::new();
    probe.expect_get().times(1).returning(|_| Ok(204));

    let config = test_config();
    let outcome = wait_for_ready(&probe, "http://127.0.0.1:5000/", &config.smoke).await;

    match outcome {
        SmokeOutcome::Healthy(report) => {
            assert_eq!(report.attempts, 1);
            assert_eq!(report.status, 204);
        }
        SmokeOutcome::Unhealthy { reason, .. } => panic!("expected healthy, got {reason}"),
    }
}

#[tokio::test]
async fn poll_budget_is_bounded() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let mut probe = MockProbe::new();
    probe.expect_get().returning(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Err(connection_refused())
    });

    let config = test_config();
    let outcome = wait_for_ready(&probe, "http://127.0.0.1:5000/", &config.smoke).await;

    assert!(matches!(outcome, SmokeOutcome::Unhealthy { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
