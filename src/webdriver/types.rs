//! WebDriver boundary types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability object sent with a new-session request
pub type Capabilities = serde_json::Map<String, serde_json::Value>;

/// Element locator, discriminated between CSS and XPath
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    /// Discriminate a raw selector: `/`, `(` and `./` start an XPath expression,
    /// everything else is CSS.
    pub fn parse(selector: &str) -> Self {
        let trimmed = selector.trim_start();
        if trimmed.starts_with('/') || trimmed.starts_with('(') || trimmed.starts_with("./") {
            Locator::XPath(selector.to_string())
        } else {
            Locator::Css(selector.to_string())
        }
    }

    pub fn css<S: Into<String>>(selector: S) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath<S: Into<String>>(expression: S) -> Self {
        Locator::XPath(expression.into())
    }

    /// Raw selector text
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }

    pub fn is_xpath(&self) -> bool {
        matches!(self, Locator::XPath(_))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Locator::parse(selector)
    }
}

/// Browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_discrimination() {
        assert_eq!(Locator::parse("#main"), Locator::Css("#main".to_string()));
        assert_eq!(Locator::parse("div > a"), Locator::Css("div > a".to_string()));
        assert!(Locator::parse("//a[@href]").is_xpath());
        assert!(Locator::parse("(//li)[2]").is_xpath());
        assert!(Locator::parse("./following-sibling::*").is_xpath());
        assert_eq!(Locator::parse(".active").as_str(), ".active");
        assert!(!Locator::parse(".active").is_xpath());
    }
}
