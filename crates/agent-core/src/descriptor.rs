//! Planner step descriptors and their conversion into plan steps

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use surefoot_core_types::{Action, ElementCategory, ElementTarget, ScrollDirection, SelectorSet, Step};
use tracing::warn;

use crate::errors::AgentError;

/// Loosely-typed step as produced by a planner collaborator.
///
/// Accepts both camelCase and snake_case keys; numbers may arrive as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDescriptor {
    pub description: String,

    #[serde(alias = "actionType", alias = "action", alias = "type")]
    pub action_type: String,

    #[serde(deserialize_with = "string_or_list")]
    #[serde(alias = "selector")]
    pub selectors: Vec<String>,

    #[serde(deserialize_with = "loose_string")]
    #[serde(alias = "text")]
    pub value: Option<String>,

    #[serde(deserialize_with = "loose_u64")]
    #[serde(alias = "waitTime", alias = "duration_ms", alias = "durationMs")]
    pub wait_time: Option<u64>,

    pub url: Option<String>,

    pub key: Option<String>,

    #[serde(alias = "elementType", alias = "element_type")]
    pub category: Option<String>,

    pub direction: Option<String>,

    #[serde(deserialize_with = "loose_u64")]
    pub index: Option<u64>,

    #[serde(alias = "fullPage")]
    pub full_page: Option<bool>,
}

impl StepDescriptor {
    pub fn new(description: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            action_type: action_type.into(),
            ..Self::default()
        }
    }

    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_wait(mut self, wait_ms: u64) -> Self {
        self.wait_time = Some(wait_ms);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Element category from the explicit hint, or inferred from the description
    pub fn element_category(&self) -> Option<ElementCategory> {
        if let Some(category) = self.category.as_deref().and_then(ElementCategory::parse_hint) {
            return Some(category);
        }
        let lowered = self.description.to_lowercase();
        if lowered.contains("search") && !lowered.contains("result") {
            Some(ElementCategory::Search)
        } else if lowered.contains("cookie") || lowered.contains("dismiss") {
            Some(ElementCategory::Close)
        } else {
            None
        }
    }

    fn target(&self) -> Result<ElementTarget, AgentError> {
        let category = self.element_category();
        if self.selectors.iter().all(|s| s.trim().is_empty()) && category.is_none() {
            return Err(AgentError::invalid_request(format!(
                "'{}' needs selectors or an element category",
                self.action_type
            )));
        }
        let target = ElementTarget::new(SelectorSet::Candidates(self.selectors.clone()));
        Ok(match category {
            Some(category) => target.with_category(category),
            None => target,
        })
    }

    fn required_value(&self) -> Result<String, AgentError> {
        self.value
            .clone()
            .ok_or_else(|| AgentError::invalid_request(format!("'{}' needs a value", self.action_type)))
    }

    /// Convert into a typed action. Unknown action types yield `Ok(None)`.
    pub fn to_action(&self) -> Result<Option<Action>, AgentError> {
        let kind: String = self
            .action_type
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();

        let action = match kind.as_str() {
            "navigate" | "goto" | "open" | "visit" => {
                let url = self
                    .url
                    .clone()
                    .or_else(|| self.value.clone())
                    .ok_or_else(|| AgentError::invalid_request("navigate needs a url"))?;
                Action::Navigate { url }
            }
            "click" | "tap" => Action::Click {
                target: self.target()?,
            },
            "type" | "fill" | "input" | "typetext" => Action::Type {
                target: self.target()?,
                text: self.required_value()?,
                clear: true,
            },
            "press" | "key" | "presskey" => Action::Press {
                key: self
                    .key
                    .clone()
                    .or_else(|| self.value.clone())
                    .unwrap_or_else(|| "Enter".to_string()),
            },
            "wait" | "sleep" => Action::Wait {
                duration_ms: self
                    .wait_time
                    .or_else(|| self.value.as_deref().and_then(|v| v.trim().parse().ok()))
                    .unwrap_or(1000),
            },
            "scroll" => {
                let raw = self
                    .direction
                    .clone()
                    .or_else(|| self.value.clone())
                    .unwrap_or_default()
                    .to_lowercase();
                let direction = match raw.as_str() {
                    "up" => ScrollDirection::Up,
                    "top" => ScrollDirection::Top,
                    "bottom" => ScrollDirection::Bottom,
                    _ => ScrollDirection::Down,
                };
                Action::Scroll {
                    direction,
                    amount: None,
                }
            }
            "select" | "selectoption" => Action::Select {
                target: self.target()?,
                value: self.required_value()?,
            },
            "screenshot" | "capture" => Action::Screenshot {
                name: self.value.clone(),
                full_page: self.full_page.unwrap_or(false),
            },
            "goback" | "back" => Action::GoBack,
            "goforward" | "forward" => Action::GoForward,
            "reload" | "refresh" => Action::Reload,
            "newtab" | "opentab" => Action::NewTab {
                url: self.url.clone().or_else(|| self.value.clone()),
            },
            "switchtab" => Action::SwitchTab {
                index: self.index.unwrap_or(0) as usize,
            },
            "closetab" => Action::CloseTab {
                index: self.index.map(|i| i as usize),
            },
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    /// Convert into a plan step. Unusable descriptors become action-less steps.
    pub fn into_step(self) -> Step {
        let description = if self.description.trim().is_empty() {
            self.action_type.clone()
        } else {
            self.description.clone()
        };
        match self.to_action() {
            Ok(Some(action)) => Step::new(description, action),
            Ok(None) => {
                warn!(action_type = %self.action_type, "unknown action type; step kept as no-op");
                Step::note(description)
            }
            Err(err) => {
                warn!(error = %err, "unusable step descriptor; step kept as no-op");
                Step::note(description)
            }
        }
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn loose_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_descriptor() {
        let descriptor: StepDescriptor = serde_json::from_value(json!({
            "description": "Type the query into the search box",
            "actionType": "type",
            "selectors": ["#APjFqb", "textarea[name=q]"],
            "value": "rust async"
        }))
        .unwrap();

        let step = descriptor.into_step();
        match step.action {
            Some(Action::Type { target, text, .. }) => {
                assert_eq!(text, "rust async");
                assert_eq!(target.selectors.primary(), Some("#APjFqb"));
                assert_eq!(target.category, Some(ElementCategory::Search));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_loose_numbers_and_single_selector() {
        let descriptor: StepDescriptor = serde_json::from_value(json!({
            "description": "pause",
            "action_type": "wait",
            "waitTime": "1500",
            "selector": "#ignored"
        }))
        .unwrap();
        assert_eq!(descriptor.selectors, vec!["#ignored"]);
        assert_eq!(descriptor.to_action().unwrap(), Some(Action::wait(1500)));
    }

    #[test]
    fn test_unknown_action_becomes_no_op() {
        let step = StepDescriptor::new("think hard", "ponder").into_step();
        assert!(step.action.is_none());
        assert_eq!(step.description, "think hard");
    }

    #[test]
    fn test_click_without_selectors_or_category_is_rejected() {
        let descriptor = StepDescriptor::new("click it", "click");
        assert!(descriptor.to_action().is_err());
        assert!(descriptor.into_step().action.is_none());
    }

    #[test]
    fn test_navigation_variants() {
        let back = StepDescriptor::new("back", "goBack").to_action().unwrap();
        assert_eq!(back, Some(Action::GoBack));
        let nav = StepDescriptor::new("open", "navigate")
            .with_value("https://example.com")
            .to_action()
            .unwrap();
        assert_eq!(
            nav,
            Some(Action::Navigate {
                url: "https://example.com".into()
            })
        );
    }
}
