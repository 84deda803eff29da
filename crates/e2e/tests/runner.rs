//! Runner behaviour with a stand-in for node
//!
//! A small shell script takes the place of the node binary and prints the
//! JSON events a real Playwright script would, so scheduling, isolation and
//! timeouts can be checked without a browser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use register_e2e::playwright::{PlaywrightConfig, StepStatus};
use register_e2e::runner::FailureKind;
use register_e2e::{RunnerConfig, Scenario, Selector, Step, TestRunner};

fn scenario(name: &str) -> Scenario {
    Scenario::new(name, "/register")
        .tag("register")
        .step(Step::assert_visible(Selector::test_id("register__button__sign-up")))
}

fn runner(dir: &Path, node: PathBuf, scenario_timeout: Duration, run_timeout: Duration) -> TestRunner {
    TestRunner::with_config(RunnerConfig {
        playwright: PlaywrightConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            screenshot_dir: dir.join("shots"),
            scenario_timeout,
            node_binary: node,
            ..Default::default()
        },
        workers: 2,
        run_timeout,
        preflight: false,
        output_dir: dir.join("out"),
    })
    .unwrap()
}

#[cfg(unix)]
fn fake_node(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-node");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn failing_scenario_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let node = fake_node(
        dir.path(),
        r#"
if grep -q 'broken' "$1"; then
  echo '{"event":"step","index":0,"passed":true,"duration_ms":1}'
  echo '{"event":"step","index":1,"passed":false,"duration_ms":50,"failure":{"kind":"timeout","selector":"[data-testid=\"register__button__sign-up\"]","timeout_ms":50}}'
  echo '{"event":"done","screenshot":null}'
  exit 1
fi
echo '{"event":"step","index":0,"passed":true,"duration_ms":1}'
echo '{"event":"step","index":1,"passed":true,"duration_ms":1}'
echo '{"event":"done","screenshot":null}'
"#,
    );
    let runner = runner(dir.path(), node, Duration::from_secs(30), Duration::from_secs(60));

    let scenarios = vec![scenario("first"), scenario("broken"), scenario("third")];
    let suite = runner.run_scenarios(&scenarios).await.unwrap();

    assert_eq!(suite.total, 3);
    assert_eq!(suite.passed, 2);
    assert_eq!(suite.failed, 1);

    let names: Vec<_> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first", "broken", "third"]);

    let broken = &suite.results[1];
    assert!(!broken.success);
    assert_eq!(broken.failure_kind, Some(FailureKind::Environment));
    assert_eq!(broken.steps[1].status, StepStatus::Failed);
    let error = broken.error.as_deref().unwrap();
    assert!(error.contains("register__button__sign-up"));
    assert!(error.contains("50 ms"));

    assert!(suite.results[0].steps.iter().all(|s| s.status == StepStatus::Passed));
}

#[cfg(unix)]
#[tokio::test]
async fn assertion_failure_reports_expected_and_actual() {
    let dir = tempfile::tempdir().unwrap();
    let node = fake_node(
        dir.path(),
        r#"
echo 'Playwright banner'
echo '{"event":"step","index":0,"passed":true,"duration_ms":1}'
echo '{"event":"step","index":1,"passed":false,"duration_ms":5,"failure":{"kind":"assertion","selector":"[data-testid=\"register__text-field__name__error\"]","expected":"text containing \"min. 5 karakter.\"","actual":"\"Wajib diisi\""}}'
echo '{"event":"done","screenshot":"/tmp/shot.png"}'
exit 1
"#,
    );
    let runner = runner(dir.path(), node, Duration::from_secs(30), Duration::from_secs(60));

    let suite = runner.run_scenarios(&[scenario("name-under-5")]).await.unwrap();
    let result = &suite.results[0];

    assert_eq!(result.failure_kind, Some(FailureKind::Assertion));
    let error = result.error.as_deref().unwrap();
    assert!(error.contains("min. 5 karakter."));
    assert!(error.contains("Wajib diisi"));
    assert_eq!(result.screenshot_path, Some(PathBuf::from("/tmp/shot.png")));
}

#[cfg(unix)]
#[tokio::test]
async fn slow_scenario_hits_scenario_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let node = fake_node(dir.path(), "sleep 5");
    let runner = runner(dir.path(), node, Duration::from_millis(200), Duration::from_secs(60));

    let suite = runner.run_scenarios(&[scenario("slow")]).await.unwrap();
    let result = &suite.results[0];

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Environment));
    assert!(result.error.as_deref().unwrap().contains("exceeded 200 ms"));
}

#[cfg(unix)]
#[tokio::test]
async fn run_timeout_fails_unfinished_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let node = fake_node(dir.path(), "sleep 5");
    let runner = runner(dir.path(), node, Duration::from_secs(30), Duration::from_millis(200));

    let suite = runner
        .run_scenarios(&[scenario("a"), scenario("b"), scenario("c")])
        .await
        .unwrap();

    assert_eq!(suite.failed, 3);
    for result in &suite.results {
        assert_eq!(result.failure_kind, Some(FailureKind::Environment));
        assert!(result.error.as_deref().unwrap().contains("Run timeout"));
    }
}

#[tokio::test]
async fn missing_node_is_a_harness_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(
        dir.path(),
        dir.path().join("no-such-node"),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );

    let suite = runner.run_scenarios(&[scenario("a"), scenario("b")]).await.unwrap();
    assert_eq!(suite.failed, 2);
    for result in &suite.results {
        assert_eq!(result.failure_kind, Some(FailureKind::Harness));
        assert!(result.steps.is_empty());
    }
}

#[tokio::test]
async fn invalid_scenario_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(
        dir.path(),
        dir.path().join("no-such-node"),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );

    let nameless = Scenario::new("", "/register");
    assert!(runner.run_scenarios(&[nameless]).await.is_err());
}

#[test_case::test_case("register", "register" ; "same name")]
#[test_case::test_case("name under 5", "name_under_5" ; "same screenshot file")]
#[tokio::test]
async fn colliding_scenarios_are_rejected_before_running(first: &str, second: &str) {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(
        dir.path(),
        dir.path().join("no-such-node"),
        Duration::from_secs(5),
        Duration::from_secs(10),
    );

    let err = runner
        .run_scenarios(&[scenario(first), scenario("other"), scenario(second)])
        .await
        .unwrap_err();
    assert!(matches!(err, register_e2e::E2eError::SpecParse(_)));
    assert!(err.to_string().contains(second));
}
