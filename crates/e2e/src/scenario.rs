//! Declarative test scenarios
//!
//! A scenario is a target URL plus a flat list of interactions and
//! assertions. Scenarios are built in code (see [`crate::register`]) or
//! loaded from YAML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::selector::Selector;

/// A complete test scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Page opened before the first step (absolute, or relative to the base URL)
    pub url: String,

    /// Viewport size for the browser
    #[serde(default)]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Replace the value of an input
    Fill {
        selector: Selector,
        value: String,
    },

    /// Check a checkbox or radio button
    Check {
        selector: Selector,
    },

    /// Click an element. A trial click only waits for the element to be
    /// actionable and does not dispatch the click.
    Click {
        selector: Selector,
        #[serde(default)]
        trial: bool,
    },

    /// Press a key, on an element or on the page
    Press {
        #[serde(default)]
        selector: Option<Selector>,
        key: String,
    },

    /// Assert something about an element
    Assert {
        selector: Selector,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

impl Step {
    pub fn fill(selector: Selector, value: impl Into<String>) -> Self {
        Step::Fill { selector, value: value.into() }
    }

    pub fn check(selector: Selector) -> Self {
        Step::Check { selector }
    }

    pub fn click(selector: Selector) -> Self {
        Step::Click { selector, trial: false }
    }

    pub fn trial_click(selector: Selector) -> Self {
        Step::Click { selector, trial: true }
    }

    pub fn press(selector: Selector, key: impl Into<String>) -> Self {
        Step::Press { selector: Some(selector), key: key.into() }
    }

    pub fn assert_visible(selector: Selector) -> Self {
        Step::Assert {
            selector,
            visible: Some(true),
            text_contains: None,
            enabled: None,
            count: None,
            timeout_ms: None,
        }
    }

    pub fn assert_hidden(selector: Selector) -> Self {
        Step::Assert {
            selector,
            visible: Some(false),
            text_contains: None,
            enabled: None,
            count: None,
            timeout_ms: None,
        }
    }

    pub fn assert_text_contains(selector: Selector, text: impl Into<String>) -> Self {
        Step::Assert {
            selector,
            visible: None,
            text_contains: Some(text.into()),
            enabled: None,
            count: None,
            timeout_ms: None,
        }
    }

    pub fn assert_enabled(selector: Selector) -> Self {
        Step::Assert {
            selector,
            visible: None,
            text_contains: None,
            enabled: Some(true),
            count: None,
            timeout_ms: None,
        }
    }

    /// Short label used in logs and results
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { url, .. } => format!("navigate:{}", url),
            Step::Fill { selector, .. } => format!("fill:{}", selector),
            Step::Check { selector } => format!("check:{}", selector),
            Step::Click { selector, trial: false } => format!("click:{}", selector),
            Step::Click { selector, trial: true } => format!("trial-click:{}", selector),
            Step::Press { key, .. } => format!("press:{}", key),
            Step::Assert { selector, .. } => format!("assert:{}", selector),
            Step::Log { message } => {
                let cut: String = message.chars().take(30).collect();
                format!("log:{}", cut)
            }
        }
    }

    /// The selector the step targets, if any
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Step::Fill { selector, .. }
            | Step::Check { selector }
            | Step::Click { selector, .. }
            | Step::Assert { selector, .. } => Some(selector),
            Step::Press { selector, .. } => selector.as_ref(),
            Step::Navigate { .. } | Step::Log { .. } => None,
        }
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            url: url.into(),
            viewport: Viewport::default(),
            steps: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Steps actually driven in the browser: the initial navigation followed
    /// by the declared steps
    pub fn execution_plan(&self) -> Vec<Step> {
        let mut plan = Vec::with_capacity(self.steps.len() + 1);
        plan.push(Step::Navigate { url: self.url.clone(), timeout_ms: None });
        plan.extend(self.steps.iter().cloned());
        plan
    }

    /// Reject scenarios that cannot run
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario without a name".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no url", self.name)));
        }
        for step in &self.steps {
            if let Step::Assert { visible, text_contains, enabled, count, .. } = step {
                if visible.is_none() && text_contains.is_none() && enabled.is_none() && count.is_none() {
                    return Err(E2eError::SpecParse(format!(
                        "scenario '{}': {} has no expectation",
                        self.name,
                        step.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: name-under-5
description: Short names are rejected
tags:
  - register
  - validation
url: /register
steps:
  - action: fill
    selector: 'testid:register__text-field__name'
    value: edi
  - action: click
    selector: '[data-testid="register__checkbox__tnc"]'
  - action: click
    selector: '[data-testid="register__button__sign-up"]'
  - action: assert
    selector: 'testid:register__text-field__name__error'
    text_contains: min. 5 karakter.
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "name-under-5");
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(
            scenario.steps[0],
            Step::fill(Selector::test_id("register__text-field__name"), "edi")
        );
        assert_eq!(
            scenario.steps[3],
            Step::assert_text_contains(
                Selector::error_of("register__text-field__name"),
                "min. 5 karakter."
            )
        );
        assert_eq!(scenario.viewport, Viewport::default());
    }

    #[test]
    fn test_assert_without_expectation_is_rejected() {
        let yaml = r#"
name: empty-assert
url: /register
steps:
  - action: assert
    selector: 'testid:register__text-field__name'
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[test]
    fn test_empty_selector_is_rejected() {
        let yaml = r#"
name: bad-selector
url: /register
steps:
  - action: click
    selector: ''
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_execution_plan_starts_with_navigation() {
        let scenario = Scenario::new("plan", "/register")
            .step(Step::click(Selector::test_id("register__button__sign-up")));
        let plan = scenario.execution_plan();
        assert_eq!(plan.len(), 2);
        assert!(matches!(&plan[0], Step::Navigate { url, .. } if url == "/register"));
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\nurl: /register\ntags: [smoke]\nsteps: []\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("a.yml"), "name: a\nurl: /register\nsteps: []\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let smoke = Scenario::filter_by_tag(&scenarios, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "b");
    }
}
