//! Core types for locator system

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use surefoot_core_types::ElementCategory;

use crate::errors::LocatorError;

/// Locator strategy enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// CSS selector strategy
    Css,

    /// ARIA role and accessible name strategy
    AriaAx,

    /// Text content strategy
    Text,

    /// XPath expression strategy
    XPath,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Css => "css",
            LocatorStrategy::AriaAx => "aria-ax",
            LocatorStrategy::Text => "text",
            LocatorStrategy::XPath => "xpath",
        }
    }
}

/// Accessible-name matcher for role locators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamePattern {
    Exact { value: String },
    Contains { value: String },
    Regex { source: String, case_insensitive: bool },
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact { value } => name.trim() == value,
            NamePattern::Contains { value } => name.to_lowercase().contains(&value.to_lowercase()),
            NamePattern::Regex {
                source,
                case_insensitive,
            } => RegexBuilder::new(source)
                .case_insensitive(*case_insensitive)
                .build()
                .map(|re| re.is_match(name))
                .unwrap_or(false),
        }
    }

    fn parse(operator: &str, raw: &str) -> Result<Self, LocatorError> {
        let raw = raw.trim();
        if operator == "=" && raw.len() >= 2 && raw.starts_with('/') {
            if let Some(end) = raw.rfind('/').filter(|end| *end > 0) {
                let source = &raw[1..end];
                let flags = &raw[end + 1..];
                if flags.chars().any(|c| c != 'i') {
                    return Err(LocatorError::InvalidLocator(format!(
                        "unsupported regex flags '{flags}'"
                    )));
                }
                let case_insensitive = flags.contains('i');
                RegexBuilder::new(source)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|err| LocatorError::InvalidLocator(err.to_string()))?;
                return Ok(NamePattern::Regex {
                    source: source.to_string(),
                    case_insensitive,
                });
            }
        }
        let value = unquote(raw).to_string();
        if operator == "*=" {
            Ok(NamePattern::Contains { value })
        } else {
            Ok(NamePattern::Exact { value })
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact { value } => write!(f, "={value:?}"),
            NamePattern::Contains { value } => write!(f, "*={value:?}"),
            NamePattern::Regex {
                source,
                case_insensitive,
            } => write!(f, "=/{source}/{}", if *case_insensitive { "i" } else { "" }),
        }
    }
}

/// A parsed element locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Locator {
    Css { selector: String },
    Role { role: String, name: Option<NamePattern> },
    Text { content: String, exact: bool },
    XPath { expression: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn role(role: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: None,
        }
    }

    /// Role locator whose accessible name matches a case-insensitive regex
    pub fn role_named(role: impl Into<String>, pattern: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: Some(NamePattern::Regex {
                source: pattern.into(),
                case_insensitive: true,
            }),
        }
    }

    /// Parse a locator string
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LocatorError::InvalidLocator("empty locator".to_string()));
        }

        if let Some(body) = input.strip_prefix("role=") {
            return parse_role(input, body);
        }

        if let Some(rest) = input.strip_prefix("text=") {
            let rest = rest.trim();
            let exact = is_quoted(rest);
            let content = unquote(rest).to_string();
            if content.is_empty() {
                return Err(LocatorError::InvalidLocator(input.to_string()));
            }
            return Ok(Locator::Text { content, exact });
        }

        if let Some(rest) = input.strip_prefix("xpath=") {
            return Ok(Locator::XPath {
                expression: rest.trim().to_string(),
            });
        }
        if input.starts_with("//") || input.starts_with("(//") {
            return Ok(Locator::XPath {
                expression: input.to_string(),
            });
        }

        let selector = input.strip_prefix("css=").unwrap_or(input).trim();
        Ok(Locator::css(selector))
    }

    pub fn strategy(&self) -> LocatorStrategy {
        match self {
            Locator::Css { .. } => LocatorStrategy::Css,
            Locator::Role { .. } => LocatorStrategy::AriaAx,
            Locator::Text { .. } => LocatorStrategy::Text,
            Locator::XPath { .. } => LocatorStrategy::XPath,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => f.write_str(selector),
            Locator::Role { role, name: None } => write!(f, "role={role}"),
            Locator::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name{name}]"),
            Locator::Text { content, exact } => {
                if *exact {
                    write!(f, "text={content:?}")
                } else {
                    write!(f, "text={content}")
                }
            }
            Locator::XPath { expression } => write!(f, "xpath={expression}"),
        }
    }
}

/// `role=<role>` optionally followed by `[name=...]` or `[name*=...]`
fn parse_role(input: &str, body: &str) -> Result<Locator, LocatorError> {
    let invalid = || LocatorError::InvalidLocator(input.to_string());
    let (role, filter) = match body.find('[') {
        Some(open) => (&body[..open], Some(&body[open..])),
        None => (body, None),
    };
    let role = role.trim();
    if role.is_empty() || !role.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return Err(invalid());
    }
    let name = match filter {
        None => None,
        Some(filter) => {
            let inner = filter
                .strip_prefix("[name")
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(invalid)?;
            let (operator, value) = if let Some(value) = inner.strip_prefix("*=") {
                ("*=", value)
            } else if let Some(value) = inner.strip_prefix('=') {
                ("=", value)
            } else {
                return Err(invalid());
            };
            Some(NamePattern::parse(operator, value)?)
        }
    };
    Ok(Locator::Role {
        role: role.to_ascii_lowercase(),
        name,
    })
}

fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
}

fn unquote(raw: &str) -> &str {
    if is_quoted(raw) {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Where the winning locator came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// One of the caller's candidates
    Explicit,

    /// A curated pattern for the category hint
    Heuristic(ElementCategory),
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub locator: Locator,

    /// Locator string as written by the caller or the heuristic table
    pub candidate: String,

    /// Position of the candidate in the caller's list; `None` for heuristics
    pub index: Option<usize>,

    pub source: ResolutionSource,
}

impl Resolution {
    /// True when the match is not the caller's first candidate
    pub fn is_fallback(&self) -> bool {
        self.index != Some(0)
    }

    pub fn strategy_label(&self) -> String {
        match self.source {
            ResolutionSource::Explicit => "explicit".to_string(),
            ResolutionSource::Heuristic(category) => format!("heuristic:{}", category.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_css_default() {
        assert_eq!(Locator::parse("#q").unwrap(), Locator::css("#q"));
        assert_eq!(
            Locator::parse("css=input[name=q]").unwrap(),
            Locator::css("input[name=q]")
        );
    }

    #[test]
    fn test_parse_role_with_regex_name() {
        let locator = Locator::parse("role=textbox[name=/search|find|query/i]").unwrap();
        match &locator {
            Locator::Role {
                role,
                name: Some(name),
            } => {
                assert_eq!(role, "textbox");
                assert!(name.matches("Search the web"));
                assert!(name.matches("QUERY"));
                assert!(!name.matches("Email"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(locator.to_string(), "role=textbox[name=/search|find|query/i]");
        assert_eq!(Locator::parse(&locator.to_string()).unwrap(), locator);
    }

    #[test]
    fn test_parse_role_exact_and_contains() {
        let exact = Locator::parse(r#"role=button[name="Sign in"]"#).unwrap();
        assert_eq!(
            exact,
            Locator::Role {
                role: "button".into(),
                name: Some(NamePattern::Exact {
                    value: "Sign in".into()
                })
            }
        );
        let contains = Locator::parse("role=link[name*=docs]").unwrap();
        assert_eq!(Locator::parse(&contains.to_string()).unwrap(), contains);
    }

    #[test]
    fn test_parse_text_and_xpath() {
        assert_eq!(
            Locator::parse("text=\"Sign in\"").unwrap(),
            Locator::Text {
                content: "Sign in".into(),
                exact: true
            }
        );
        assert_eq!(
            Locator::parse("//button[1]").unwrap().strategy(),
            LocatorStrategy::XPath
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Locator::parse("   ").is_err());
        assert!(Locator::parse("role=textbox[name=/([/]").is_err());
        assert!(Locator::parse("role=").is_err());
    }
}
