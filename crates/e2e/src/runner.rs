//! Main test runner: preflight, parallel scenario execution and reporting

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, StepResult};
use crate::scenario::Scenario;

/// How a scenario failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Page unreachable, element never appeared, timeouts
    Environment,
    /// The page rendered something other than expected
    Assertion,
    /// The harness itself could not drive the browser
    Harness,
}

impl FailureKind {
    fn of(err: &E2eError) -> Self {
        if err.is_assertion() {
            FailureKind::Assertion
        } else if err.is_environment() {
            FailureKind::Environment
        } else {
            FailureKind::Harness
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub failure_kind: Option<FailureKind>,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    fn failed(name: &str, duration_ms: u64, err: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms,
            steps: vec![],
            failure_kind: Some(FailureKind::of(err)),
            error: Some(err.to_string()),
            screenshot_path: None,
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(
        started_at: DateTime<Utc>,
        base_url: &str,
        duration_ms: u64,
        results: Vec<TestResult>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            base_url: base_url.to_string(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    /// Shared by every scenario task
    playwright: Arc<PlaywrightHandle>,

    /// Maximum number of browsers at once
    workers: usize,

    /// Limit for the whole run
    run_timeout: Duration,

    /// Check the base URL answers before launching browsers
    preflight: bool,

    /// Output directory for results
    output_dir: PathBuf,
}

impl TestRunner {
    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        Ok(Self {
            playwright: Arc::new(PlaywrightHandle::new(config.playwright)?),
            workers: config.workers.max(1),
            run_timeout: config.run_timeout,
            preflight: config.preflight,
            output_dir: config.output_dir,
        })
    }

    pub fn playwright(&self) -> &PlaywrightHandle {
        &self.playwright
    }

    /// Fail fast when the target page cannot be reached at all
    pub async fn check_reachable(&self) -> E2eResult<()> {
        let base_url = self.playwright.config().base_url.clone();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.playwright.config().navigation_timeout_ms))
            .build()?;

        info!("Checking {} is reachable", base_url);

        match client.get(&base_url).send().await {
            Ok(resp) if resp.status().is_server_error() => Err(E2eError::Unreachable {
                url: base_url,
                reason: format!("status {}", resp.status()),
            }),
            Ok(resp) => {
                debug!("Preflight returned {}", resp.status());
                Ok(())
            }
            Err(e) => Err(E2eError::Unreachable {
                url: base_url,
                reason: e.to_string(),
            }),
        }
    }

    /// Run scenarios in parallel, each in its own browser.
    ///
    /// A failing scenario never stops the others. Results come back in the
    /// order the scenarios were given.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        // Names key the results and the screenshot files
        let mut screenshots = HashMap::new();
        for scenario in scenarios {
            scenario.validate()?;
            let shot = self.playwright.screenshot_path(&scenario.name);
            if let Some(other) = screenshots.insert(shot, scenario.name.as_str()) {
                return Err(E2eError::SpecParse(format!(
                    "scenarios '{}' and '{}' would share a name or screenshot file",
                    other, scenario.name
                )));
            }
        }

        if self.preflight {
            self.check_reachable().await?;
        }

        info!("Running {} scenario(s) with {} worker(s)...", scenarios.len(), self.workers);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.iter().cloned().enumerate() {
            let playwright = Arc::clone(&self.playwright);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(run_one(&playwright, &scenario))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            TestResult::failed(
                                &scenario.name,
                                0,
                                &E2eError::Playwright("scenario task panicked".to_string()),
                            )
                        }),
                    Err(_) => TestResult::failed(
                        &scenario.name,
                        0,
                        &E2eError::Playwright("worker pool closed".to_string()),
                    ),
                };
                (index, result)
            });
        }

        let deadline = tokio::time::Instant::now() + self.run_timeout;
        let mut slots: Vec<Option<TestResult>> = vec![None; scenarios.len()];
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, result)))) => {
                    report(&result);
                    slots[index] = Some(result);
                }
                Ok(Some(Err(e))) => {
                    error!("Scenario task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Run timeout of {:?} reached, aborting remaining scenarios", self.run_timeout);
                    tasks.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        // Panics are caught inside the task, so empty slots were cut off
        let missing = if timed_out {
            E2eError::RunTimeout(self.run_timeout.as_millis() as u64)
        } else {
            E2eError::Playwright("scenario task was cancelled".to_string())
        };
        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(scenarios)
            .map(|(slot, scenario)| {
                slot.unwrap_or_else(|| {
                    let result = TestResult::failed(&scenario.name, 0, &missing);
                    report(&result);
                    result
                })
            })
            .collect();

        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::from_results(
            started_at,
            &self.playwright.config().base_url,
            duration_ms,
            results,
        );

        info!("");
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );

        Ok(suite)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Execute one scenario and fold its steps into a result
async fn run_one(playwright: &PlaywrightHandle, scenario: &Scenario) -> TestResult {
    let start = Instant::now();
    debug!("Running scenario: {}", scenario.name);

    let run = match playwright.run_scenario(scenario).await {
        Ok(run) => run,
        Err(e) => return TestResult::failed(&scenario.name, start.elapsed().as_millis() as u64, &e),
    };

    let err = run
        .first_failure()
        .map(|(step, failure)| failure.to_error(&step.step_name));

    TestResult {
        name: scenario.name.clone(),
        success: err.is_none(),
        duration_ms: start.elapsed().as_millis() as u64,
        failure_kind: err.as_ref().map(FailureKind::of),
        error: err.map(|e| e.to_string()),
        screenshot_path: run.screenshot_path,
        steps: run.steps,
    }
}

fn report(result: &TestResult) {
    if result.success {
        info!("✓ {} ({} ms)", result.name, result.duration_ms);
    } else {
        error!(
            "✗ {} - {}",
            result.name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub workers: usize,
    pub run_timeout: Duration,
    pub preflight: bool,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            workers: 4,
            run_timeout: Duration::from_secs(600),
            preflight: true,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, success: bool) -> TestResult {
        TestResult {
            name: name.to_string(),
            success,
            duration_ms: 10,
            steps: vec![],
            failure_kind: (!success).then_some(FailureKind::Assertion),
            error: (!success).then(|| "boom".to_string()),
            screenshot_path: None,
        }
    }

    #[test]
    fn test_suite_totals() {
        let suite = TestSuiteResult::from_results(
            Utc::now(),
            "https://forms.example.test",
            30,
            vec![result("a", true), result("b", false), result("c", true)],
        );
        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 2);
        assert_eq!(suite.failed, 1);
        assert!(!suite.all_passed());
    }

    #[test]
    fn test_failure_kind_classification() {
        let timeout = E2eError::ElementTimeout { selector: "x".into(), timeout_ms: 1 };
        assert_eq!(FailureKind::of(&timeout), FailureKind::Environment);

        let mismatch = E2eError::AssertionFailed {
            selector: "x".into(),
            expected: "a".into(),
            actual: "b".into(),
        };
        assert_eq!(FailureKind::of(&mismatch), FailureKind::Assertion);

        let driver = E2eError::Playwright("crash".into());
        assert_eq!(FailureKind::of(&driver), FailureKind::Harness);
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner::with_config(RunnerConfig {
            playwright: PlaywrightConfig {
                screenshot_dir: dir.path().join("shots"),
                ..Default::default()
            },
            output_dir: dir.path().join("out"),
            ..Default::default()
        })
        .unwrap();

        let suite = TestSuiteResult::from_results(Utc::now(), "https://a.test", 1, vec![result("a", true)]);
        let path = runner.write_results(&suite).unwrap();

        let parsed: TestSuiteResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.results[0].name, "a");
    }
}
