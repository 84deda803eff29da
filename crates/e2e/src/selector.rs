//! Stable element selectors
//!
//! Elements are addressed by attribute so that styling and layout changes do
//! not break scenarios. The registration page tags every control with
//! `data-testid`, and the validation message of a field lives under the same
//! id suffixed with `__error`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Attribute used for stable test identifiers
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// Suffix of the element that carries a field's validation message
pub const ERROR_SUFFIX: &str = "__error";

/// Shorthand accepted in scenario files: `testid:register__button__sign-up`
const TEST_ID_PREFIX: &str = "testid:";

/// A Playwright selector string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector(String);

impl Selector {
    /// `[data-testid="<id>"]`
    pub fn test_id(id: &str) -> Self {
        Selector(format!(r#"[{}="{}"]"#, TEST_ID_ATTRIBUTE, id.replace('"', "\\\"")))
    }

    /// `<tag>[data-testid="<id>"]`, for ids that a wrapper element may share
    pub fn tagged(tag: &str, id: &str) -> Self {
        Selector(format!("{}{}", tag, Self::test_id(id).0))
    }

    /// The validation message element belonging to a field test id
    pub fn error_of(id: &str) -> Self {
        Self::test_id(&format!("{}{}", id, ERROR_SUFFIX))
    }

    /// An XPath expression, e.g. `//input[@data-testid="..."]`
    pub fn xpath(expr: &str) -> Self {
        Selector(format!("xpath={}", expr))
    }

    /// Raw CSS selector
    pub fn css(expr: &str) -> Self {
        Selector(expr.to_string())
    }

    /// Parse a selector written in a scenario file
    pub fn parse(raw: &str) -> E2eResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(E2eError::InvalidSelector("empty selector".to_string()));
        }

        if let Some(id) = raw.strip_prefix(TEST_ID_PREFIX) {
            let id = id.trim();
            if id.is_empty() {
                return Err(E2eError::InvalidSelector(raw.to_string()));
            }
            return Ok(Self::test_id(id));
        }

        Ok(Selector(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Selector {
    type Error = E2eError;

    fn try_from(value: String) -> E2eResult<Self> {
        Self::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_id_selector() {
        let sel = Selector::test_id("register__text-field__name");
        assert_eq!(sel.as_str(), r#"[data-testid="register__text-field__name"]"#);
    }

    #[test]
    fn test_tagged_selector() {
        let sel = Selector::tagged("button", "register__button__sign-up");
        assert_eq!(sel.as_str(), r#"button[data-testid="register__button__sign-up"]"#);
    }

    #[test]
    fn test_error_selector() {
        let sel = Selector::error_of("register__text-field__email");
        assert_eq!(sel.as_str(), r#"[data-testid="register__text-field__email__error"]"#);
    }

    #[test]
    fn test_xpath_selector() {
        let sel = Selector::xpath(r#"//button[@data-testid="register__button__sign-up"]"#);
        assert!(sel.as_str().starts_with("xpath=//button"));
    }

    #[test]
    fn test_parse_shorthand() {
        let sel = Selector::parse("testid:register__checkbox__tnc").unwrap();
        assert_eq!(sel, Selector::test_id("register__checkbox__tnc"));

        let raw = Selector::parse("input[name=email]").unwrap();
        assert_eq!(raw.as_str(), "input[name=email]");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Selector::parse("   ").is_err());
        assert!(Selector::parse("testid:").is_err());
    }
}
