//! Registration form E2E tests
//!
//! This crate drives a real browser against the Melaka dashboard sign-up
//! page and checks what it renders:
//! - Builds scenarios in code or loads them from YAML
//! - Compiles each scenario into one Playwright script and runs it with node
//! - Runs scenarios in parallel, one isolated browser each
//! - Reports per-step results with expected vs. actual on failure
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── check_reachable()                                    │
//! │    ├── run_scenarios(&[Scenario]) -> TestSuiteResult        │
//! │    └── write_results(&TestSuiteResult)                      │
//! │  PlaywrightHandle                                           │
//! │    ├── build_script(&Scenario) -> String                    │
//! │    └── run_scenario(&Scenario) -> ScenarioRun               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── name, description, tags, url                         │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate { url }                               │
//! │          ├── fill { selector, value }                       │
//! │          ├── check { selector }                             │
//! │          ├── click { selector, trial }                      │
//! │          ├── assert { selector, visible?, text_contains?,   │
//! │          │            enabled?, count? }                    │
//! │          └── log { message }                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod playwright;
pub mod register;
pub mod runner;
pub mod scenario;
pub mod selector;

pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, TestRunner, TestSuiteResult};
pub use scenario::{Scenario, Step};
pub use selector::Selector;
