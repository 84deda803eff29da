//! Playwright browser automation
//!
//! Every scenario is compiled into one self-contained Node.js script: one
//! browser, one context, one page. The script reports each step as a JSON
//! line on stdout and finishes with a `done` event, which is parsed back into
//! [`StepResult`]s on the Rust side.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::scenario::{Scenario, Step};

/// Playwright browser handle
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,

    /// Absolute screenshot directory (scripts run from a temp dir)
    screenshot_dir: PathBuf,

    /// Absolute `node_modules` used to resolve `require('playwright')`
    node_modules: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("unknown browser '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not reached because an earlier step failed
    Skipped,
}

/// Why a step failed, as reported by the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    /// The element never appeared or never became actionable
    Timeout {
        selector: String,
        timeout_ms: u64,
        #[serde(default)]
        message: String,
    },
    /// The page did not finish loading
    NavigationTimeout {
        url: String,
        timeout_ms: u64,
        #[serde(default)]
        message: String,
    },
    /// The page could not be loaded at all
    Navigation {
        url: String,
        #[serde(default)]
        message: String,
    },
    /// The element exists but its state or text differs
    Assertion {
        selector: String,
        expected: String,
        actual: String,
    },
    /// Anything else thrown by Playwright
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StepFailure {
    pub fn to_error(&self, step_name: &str) -> E2eError {
        match self {
            StepFailure::Timeout { selector, timeout_ms, .. } => E2eError::ElementTimeout {
                selector: selector.clone(),
                timeout_ms: *timeout_ms,
            },
            StepFailure::NavigationTimeout { url, timeout_ms, .. } => E2eError::NavigationTimeout {
                url: url.clone(),
                timeout_ms: *timeout_ms,
            },
            StepFailure::Navigation { url, message } => E2eError::Navigation {
                url: url.clone(),
                reason: message.clone(),
            },
            StepFailure::Assertion { selector, expected, actual } => E2eError::AssertionFailed {
                selector: selector.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            StepFailure::Error { message } => E2eError::StepFailed {
                step: step_name.to_string(),
                reason: message.clone(),
            },
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub failure: Option<StepFailure>,
}

impl StepResult {
    pub fn success(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Everything one scenario script reported
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub steps: Vec<StepResult>,
    pub screenshot_path: Option<PathBuf>,
}

impl ScenarioRun {
    /// The first failing step, if any
    pub fn first_failure(&self) -> Option<(&StepResult, &StepFailure)> {
        self.steps
            .iter()
            .find_map(|s| s.failure.as_ref().map(|f| (s, f)))
    }
}

/// One JSON line printed by a scenario script
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScriptEvent {
    Step {
        index: usize,
        passed: bool,
        #[serde(default)]
        duration_ms: u64,
        #[serde(default)]
        failure: Option<StepFailure>,
    },
    Log {
        message: String,
    },
    Done {
        #[serde(default)]
        screenshot: Option<String>,
    },
}

/// Helpers shared by every generated script
const PRELUDE: &str = r#"
const emit = (event) => console.log(JSON.stringify(event));
const sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
const firstLine = (err) => String((err && err.message) || err).split('\n')[0];
const isTimeout = (err) => Boolean(err) && err.name === 'TimeoutError';
// Whitespace runs (newlines, indentation, nbsp) count as one space
const normalize = (text) => String(text || '').replace(/[\s\u00a0]+/g, ' ').trim();

class StepFailure extends Error {
  constructor(failure) {
    super(failure.message || failure.kind);
    this.failure = failure;
  }
}

class Aborted extends Error {}

async function runStep(index, body) {
  const started = Date.now();
  try {
    await body();
    emit({ event: 'step', index, passed: true, duration_ms: Date.now() - started });
  } catch (err) {
    const failure = err instanceof StepFailure
      ? err.failure
      : { kind: 'error', message: firstLine(err) };
    emit({ event: 'step', index, passed: false, duration_ms: Date.now() - started, failure });
    throw new Aborted();
  }
}

async function locate(page, selector, timeout) {
  const locator = page.locator(selector);
  try {
    await page.waitForSelector(selector, { state: 'attached', timeout });
  } catch (err) {
    if (isTimeout(err)) {
      throw new StepFailure({ kind: 'timeout', selector, timeout_ms: timeout, message: firstLine(err) });
    }
    throw err;
  }
  // strict: more than one match is a broken selector
  const n = await locator.count();
  if (n > 1) {
    throw new StepFailure({ kind: 'assertion', selector, expected: 'exactly one element', actual: n + ' elements' });
  }
  return locator;
}

async function interact(selector, timeout, action) {
  try {
    await action();
  } catch (err) {
    if (isTimeout(err)) {
      throw new StepFailure({ kind: 'timeout', selector, timeout_ms: timeout, message: firstLine(err) });
    }
    throw err;
  }
}

async function poll(check, timeout) {
  const deadline = Date.now() + timeout;
  for (;;) {
    const state = await check();
    if (state.ok || Date.now() >= deadline) return state;
    await sleep(100);
  }
}

function expectState(selector, state, expected) {
  if (!state.ok) {
    throw new StepFailure({ kind: 'assertion', selector, expected, actual: state.actual });
  }
}

async function visibleCount(page, selector) {
  const all = page.locator(selector);
  const n = await all.count();
  let shown = 0;
  for (let i = 0; i < n; i++) {
    if (await all.nth(i).isVisible()) shown++;
  }
  return shown;
}
"#;

/// Render a Rust string as a JavaScript string literal
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Join a scenario URL onto the base URL unless it is already absolute
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = url.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// File-system friendly version of a scenario name
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn absolute(path: &Path) -> E2eResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        std::fs::create_dir_all(&config.screenshot_dir)?;
        let screenshot_dir = absolute(&config.screenshot_dir)?;
        let node_modules = absolute(&config.node_modules)?;

        Ok(Self {
            config,
            screenshot_dir,
            node_modules,
        })
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Check that node can resolve the Playwright package
    pub async fn check_playwright_installed(&self) -> E2eResult<()> {
        let status = TokioCommand::new(&self.config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .env("NODE_PATH", self.node_path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn node_path(&self) -> std::ffi::OsString {
        let mut paths = vec![self.node_modules.clone()];
        if let Some(existing) = std::env::var_os("NODE_PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths).unwrap_or_else(|_| self.node_modules.clone().into_os_string())
    }

    /// Where the failure screenshot of a scenario is written
    pub fn screenshot_path(&self, scenario_name: &str) -> PathBuf {
        self.screenshot_dir.join(format!("{}.png", file_stem(scenario_name)))
    }

    /// Build the Playwright script for a scenario
    pub fn build_script(&self, scenario: &Scenario) -> String {
        let plan = scenario.execution_plan();
        let screenshot = self.screenshot_path(&scenario.name);
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            "const {{ {browser} }} = require('playwright');\n",
            browser = self.config.browser.as_str()
        ));
        script.push_str(PRELUDE);
        script.push_str(&format!(
            r#"
(async () => {{
  let browser;
  let failed = false;
  let screenshot = null;
  try {{
    browser = await {browser}.launch({{ headless: {headless} }});
    const context = await browser.newContext({{
      viewport: {{ width: {width}, height: {height} }}
    }});
    context.setDefaultTimeout({timeout});
    const page = await context.newPage();

    try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = scenario.viewport.width,
            height = scenario.viewport.height,
            timeout = self.config.default_timeout_ms,
        ));

        // Generate step code
        for (i, step) in plan.iter().enumerate() {
            script.push_str(&format!("\n      // Step {}: {}\n", i + 1, step.name().replace('\n', " ")));
            script.push_str(&format!("      await runStep({}, async () => {{\n", i));
            script.push_str(&self.step_to_js(step, i));
            script.push_str("\n      });\n");
        }

        // Footer
        script.push_str(&format!(
            r#"
    }} catch (err) {{
      if (!(err instanceof Aborted)) throw err;
      failed = true;
      screenshot = {screenshot};
      await page.screenshot({{ path: screenshot, fullPage: true }}).catch(() => {{ screenshot = null; }});
    }}
    emit({{ event: 'done', screenshot }});
    process.exitCode = failed ? 1 : 0;
  }} catch (err) {{
    console.error(JSON.stringify({{ error: firstLine(err), stack: err && err.stack }}));
    process.exitCode = 2;
  }} finally {{
    if (browser) await browser.close();
  }}
}})();
"#,
            screenshot = js_str(&screenshot.to_string_lossy()),
        ));

        script
    }

    /// Convert a step to the body of its `runStep` callback
    fn step_to_js(&self, step: &Step, step_index: usize) -> String {
        let default_timeout = self.config.default_timeout_ms;

        match step {
            Step::Navigate { url, timeout_ms } => {
                let url = js_str(&resolve_url(&self.config.base_url, url));
                let timeout = timeout_ms.unwrap_or(self.config.navigation_timeout_ms);
                format!(
                    r#"        const url = {url};
        let response;
        try {{
          response = await page.goto(url, {{ waitUntil: 'load', timeout: {timeout} }});
        }} catch (err) {{
          if (isTimeout(err)) {{
            throw new StepFailure({{ kind: 'navigation_timeout', url, timeout_ms: {timeout}, message: firstLine(err) }});
          }}
          throw new StepFailure({{ kind: 'navigation', url, message: firstLine(err) }});
        }}
        if (response && response.status() >= 400) {{
          throw new StepFailure({{ kind: 'navigation', url, message: 'HTTP ' + response.status() }});
        }}"#
                )
            }
            Step::Fill { selector, value } => {
                let sel = js_str(selector.as_str());
                format!(
                    r#"        const locator = await locate(page, {sel}, {t});
        await interact({sel}, {t}, () => locator.fill({value}, {{ timeout: {t} }}));"#,
                    value = js_str(value),
                    t = default_timeout,
                )
            }
            Step::Check { selector } => {
                let sel = js_str(selector.as_str());
                format!(
                    r#"        const locator = await locate(page, {sel}, {t});
        await interact({sel}, {t}, () => locator.check({{ timeout: {t} }}));"#,
                    t = default_timeout,
                )
            }
            Step::Click { selector, trial } => {
                let sel = js_str(selector.as_str());
                format!(
                    r#"        const locator = await locate(page, {sel}, {t});
        await interact({sel}, {t}, () => locator.click({{ timeout: {t}, trial: {trial} }}));"#,
                    t = default_timeout,
                )
            }
            Step::Press { selector: Some(selector), key } => {
                let sel = js_str(selector.as_str());
                format!(
                    r#"        const locator = await locate(page, {sel}, {t});
        await interact({sel}, {t}, () => locator.press({key}, {{ timeout: {t} }}));"#,
                    key = js_str(key),
                    t = default_timeout,
                )
            }
            Step::Press { selector: None, key } => {
                format!(r#"        await page.keyboard.press({});"#, js_str(key))
            }
            Step::Assert { selector, visible, text_contains, enabled, count, timeout_ms } => {
                let sel = js_str(selector.as_str());
                let t = timeout_ms.unwrap_or(default_timeout);
                let mut assertions = Vec::new();

                match visible {
                    Some(true) => assertions.push(format!(
                        r#"        {{
          const locator = await locate(page, {sel}, {t});
          expectState({sel}, await poll(async () => {{
            const shown = await locator.isVisible();
            return {{ ok: shown, actual: shown ? 'visible' : 'hidden' }};
          }}, {t}), 'visible');
        }}"#
                    )),
                    Some(false) => assertions.push(format!(
                        r#"        expectState({sel}, await poll(async () => {{
          const shown = await visibleCount(page, {sel});
          return {{ ok: shown === 0, actual: shown + ' visible element(s)' }};
        }}, {t}), 'hidden');"#
                    )),
                    None => {}
                }

                if let Some(text) = text_contains {
                    assertions.push(format!(
                        r#"        {{
          const locator = await locate(page, {sel}, {t});
          const needle = normalize({needle});
          expectState({sel}, await poll(async () => {{
            const text = normalize(await locator.textContent());
            return {{ ok: text.includes(needle), actual: JSON.stringify(text) }};
          }}, {t}), {expected});
        }}"#,
                        needle = js_str(text),
                        expected = js_str(&format!("text containing \"{}\"", text)),
                    ));
                }

                if let Some(want) = enabled {
                    assertions.push(format!(
                        r#"        {{
          const locator = await locate(page, {sel}, {t});
          expectState({sel}, await poll(async () => {{
            const on = await locator.isEnabled();
            return {{ ok: on === {want}, actual: on ? 'enabled' : 'disabled' }};
          }}, {t}), {expected});
        }}"#,
                        expected = js_str(if *want { "enabled" } else { "disabled" }),
                    ));
                }

                if let Some(n) = count {
                    assertions.push(format!(
                        r#"        expectState({sel}, await poll(async () => {{
          const n = await page.locator({sel}).count();
          return {{ ok: n === {n}, actual: n + ' element(s)' }};
        }}, {t}), '{n} element(s)');"#
                    ));
                }

                assertions.join("\n")
            }
            Step::Log { message } => {
                format!(
                    r#"        emit({{ event: 'log', index: {}, message: {} }});"#,
                    step_index,
                    js_str(message)
                )
            }
        }
    }

    /// Run a scenario in its own browser and collect per-step results
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioRun> {
        let script = self.build_script(scenario);

        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        tokio::fs::write(&script_path, &script).await?;

        debug!("Running Playwright script for {}: {}", scenario.name, script_path.display());

        let child = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", self.node_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "failed to start {}: {}",
                    self.config.node_binary.display(),
                    e
                ))
            })?;

        // Dropping the child on timeout kills the browser process tree root
        let output = match tokio::time::timeout(self.config.scenario_timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(E2eError::ScenarioTimeout {
                    name: scenario.name.clone(),
                    timeout_ms: self.config.scenario_timeout.as_millis() as u64,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_events(&scenario.execution_plan(), &stdout, &stderr)
    }
}

/// Turn the script's stdout into step results
pub fn parse_events(plan: &[Step], stdout: &str, stderr: &str) -> E2eResult<ScenarioRun> {
    let mut reported: Vec<Option<StepResult>> = vec![None; plan.len()];
    let mut done = None;

    for line in stdout.lines().map(str::trim).filter(|l| l.starts_with('{')) {
        let event: ScriptEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                debug!("Ignoring script output line ({}): {}", e, line);
                continue;
            }
        };

        match event {
            ScriptEvent::Step { index, passed, duration_ms, failure } => {
                let Some(step) = plan.get(index) else {
                    warn!("Script reported unknown step index {}", index);
                    continue;
                };
                let failure = if passed {
                    None
                } else {
                    Some(failure.unwrap_or(StepFailure::Error {
                        message: "step failed without details".to_string(),
                    }))
                };
                reported[index] = Some(StepResult {
                    index,
                    step_name: step.name(),
                    status: if passed { StepStatus::Passed } else { StepStatus::Failed },
                    duration_ms,
                    failure,
                });
            }
            ScriptEvent::Log { message } => {
                info!("[TEST LOG] {}", message);
            }
            ScriptEvent::Done { screenshot } => {
                done = Some(screenshot.map(PathBuf::from));
            }
        }
    }

    let Some(screenshot_path) = done else {
        let reason = stderr.trim();
        return Err(E2eError::Playwright(if reason.is_empty() {
            "script exited without reporting completion".to_string()
        } else {
            format!("script exited without reporting completion: {}", reason)
        }));
    };

    let steps = reported
        .into_iter()
        .zip(plan)
        .enumerate()
        .map(|(index, (result, step))| {
            result.unwrap_or_else(|| StepResult {
                index,
                step_name: step.name(),
                status: StepStatus::Skipped,
                duration_ms: 0,
                failure: None,
            })
        })
        .collect();

    Ok(ScenarioRun { steps, screenshot_path })
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    /// Timeout for locating, interacting with and asserting on elements
    pub default_timeout_ms: u64,
    /// Timeout for a page load
    pub navigation_timeout_ms: u64,
    /// Hard limit for a whole scenario process
    pub scenario_timeout: Duration,
    pub node_binary: PathBuf,
    pub node_modules: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: crate::register::DEFAULT_BASE_URL.to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            browser: Browser::Chromium,
            headless: true,
            default_timeout_ms: 5000,
            navigation_timeout_ms: 30_000,
            scenario_timeout: Duration::from_secs(120),
            node_binary: PathBuf::from("node"),
            node_modules: PathBuf::from("node_modules"),
        }
    }
}
