//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Target unreachable: {url} - {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Page did not load: {url} within {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timeout waiting for '{selector}' after {timeout_ms} ms")]
    ElementTimeout { selector: String, timeout_ms: u64 },

    #[error("Assertion failed on '{selector}': expected {expected}, got {actual}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
    },

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Scenario '{name}' exceeded {timeout_ms} ms")]
    ScenarioTimeout { name: String, timeout_ms: u64 },

    #[error("Run timeout reached after {0} ms")]
    RunTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Failures caused by the environment rather than by the page's content:
    /// an unreachable target, a page that never loads, an element that never
    /// appears, or a run that ran out of time.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            E2eError::Unreachable { .. }
                | E2eError::NavigationTimeout { .. }
                | E2eError::Navigation { .. }
                | E2eError::ElementTimeout { .. }
                | E2eError::ScenarioTimeout { .. }
                | E2eError::RunTimeout(_)
                | E2eError::Http(_)
        )
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, E2eError::AssertionFailed { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = E2eError::ElementTimeout {
            selector: "[data-testid=\"x\"]".into(),
            timeout_ms: 5000,
        };
        assert!(timeout.is_environment());
        assert!(!timeout.is_assertion());

        let mismatch = E2eError::AssertionFailed {
            selector: "[data-testid=\"x__error\"]".into(),
            expected: "text containing \"Wajib diisi\"".into(),
            actual: "\"\"".into(),
        };
        assert!(mismatch.is_assertion());
        assert!(!mismatch.is_environment());
    }

    #[test]
    fn test_diagnostics_carry_selector_and_timeout() {
        let err = E2eError::ElementTimeout {
            selector: "[data-testid=\"register__button__sign-up\"]".into(),
            timeout_ms: 7500,
        };
        let msg = err.to_string();
        assert!(msg.contains("register__button__sign-up"));
        assert!(msg.contains("7500 ms"));
    }
}
