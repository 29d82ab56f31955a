//! Browser action sum type and selector candidate sets

use serde::{Deserialize, Serialize};
use std::fmt;

/// One or more element locators in priority order.
///
/// The first candidate is the most specific. Producers of candidate lists must keep that order
/// because the resolver stops at the first visible match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSet {
    /// A single locator string
    Single(String),

    /// Ordered candidate locators
    Candidates(Vec<String>),
}

impl SelectorSet {
    /// Non-empty candidates in priority order
    pub fn candidates(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            SelectorSet::Single(selector) => vec![selector.as_str()],
            SelectorSet::Candidates(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|candidate| !candidate.is_empty())
            .collect()
    }

    /// Highest-priority candidate
    pub fn primary(&self) -> Option<&str> {
        self.candidates().into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.candidates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a new set with `preferred` first, followed by the remaining original candidates.
    ///
    /// Duplicates are dropped, keeping the earliest occurrence.
    pub fn promote(&self, preferred: &[String]) -> SelectorSet {
        let mut ordered: Vec<String> = Vec::new();
        let originals = self.candidates();
        for candidate in preferred
            .iter()
            .map(|s| s.trim())
            .chain(originals.into_iter())
        {
            if candidate.is_empty() || ordered.iter().any(|existing| existing == candidate) {
                continue;
            }
            ordered.push(candidate.to_string());
        }
        SelectorSet::Candidates(ordered)
    }
}

impl From<&str> for SelectorSet {
    fn from(value: &str) -> Self {
        SelectorSet::Single(value.to_string())
    }
}

impl From<String> for SelectorSet {
    fn from(value: String) -> Self {
        SelectorSet::Single(value)
    }
}

impl From<Vec<String>> for SelectorSet {
    fn from(value: Vec<String>) -> Self {
        SelectorSet::Candidates(value)
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.candidates().join(" | "))
    }
}

/// Element category hint used to pick heuristic fallback locators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Search,
    Button,
    Submit,
    Input,
    Link,
    Checkbox,
    Select,
    Close,
    #[serde(other)]
    Unknown,
}

impl ElementCategory {
    /// Parse a loose hint such as `"searchbox"` or `"Dismiss"`.
    pub fn parse_hint(hint: &str) -> Option<Self> {
        let normalized = hint.trim().to_ascii_lowercase();
        let category = match normalized.as_str() {
            "search" | "searchbox" | "search_box" | "query" => ElementCategory::Search,
            "button" | "btn" => ElementCategory::Button,
            "submit" => ElementCategory::Submit,
            "input" | "textbox" | "text" | "field" | "textarea" => ElementCategory::Input,
            "link" | "anchor" => ElementCategory::Link,
            "checkbox" | "check" => ElementCategory::Checkbox,
            "select" | "dropdown" | "combobox" => ElementCategory::Select,
            "close" | "dismiss" | "overlay" | "modal" => ElementCategory::Close,
            _ => return None,
        };
        Some(category)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementCategory::Search => "search",
            ElementCategory::Button => "button",
            ElementCategory::Submit => "submit",
            ElementCategory::Input => "input",
            ElementCategory::Link => "link",
            ElementCategory::Checkbox => "checkbox",
            ElementCategory::Select => "select",
            ElementCategory::Close => "close",
            ElementCategory::Unknown => "unknown",
        }
    }
}

/// Element targeted by a selector-bearing action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTarget {
    pub selectors: SelectorSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ElementCategory>,
}

impl ElementTarget {
    pub fn new(selectors: impl Into<SelectorSet>) -> Self {
        Self {
            selectors: selectors.into(),
            category: None,
        }
    }

    /// Target built from an ordered candidate list
    pub fn candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SelectorSet::Candidates(
            candidates.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn with_category(mut self, category: ElementCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Scroll direction for [`Action::Scroll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

/// A single browser operation.
///
/// Closed set; drivers match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        url: String,
    },
    Click {
        target: ElementTarget,
    },
    Type {
        target: ElementTarget,
        text: String,
        #[serde(default)]
        clear: bool,
    },
    Press {
        key: String,
    },
    Wait {
        duration_ms: u64,
    },
    Scroll {
        direction: ScrollDirection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    },
    Select {
        target: ElementTarget,
        value: String,
    },
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        full_page: bool,
    },
    GoBack,
    GoForward,
    Reload,
    NewTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    SwitchTab {
        index: usize,
    },
    CloseTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

impl Action {
    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Press { .. } => "press",
            Action::Wait { .. } => "wait",
            Action::Scroll { .. } => "scroll",
            Action::Select { .. } => "select",
            Action::Screenshot { .. } => "screenshot",
            Action::GoBack => "go_back",
            Action::GoForward => "go_forward",
            Action::Reload => "reload",
            Action::NewTab { .. } => "new_tab",
            Action::SwitchTab { .. } => "switch_tab",
            Action::CloseTab { .. } => "close_tab",
        }
    }

    pub fn target(&self) -> Option<&ElementTarget> {
        match self {
            Action::Click { target } | Action::Type { target, .. } | Action::Select { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    pub fn target_mut(&mut self) -> Option<&mut ElementTarget> {
        match self {
            Action::Click { target } | Action::Type { target, .. } | Action::Select { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    pub fn wait(duration_ms: u64) -> Self {
        Action::Wait { duration_ms }
    }

    pub fn press(key: impl Into<String>) -> Self {
        Action::Press { key: key.into() }
    }

    pub fn click(target: ElementTarget) -> Self {
        Action::Click { target }
    }

    /// Short human-readable summary used in logs and progress events
    pub fn describe(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate to {url}"),
            Action::Click { target } => format!("click {}", target.selectors),
            Action::Type { target, text, .. } => {
                format!("type {:?} into {}", text, target.selectors)
            }
            Action::Press { key } => format!("press {key}"),
            Action::Wait { duration_ms } => format!("wait {duration_ms}ms"),
            Action::Scroll { direction, amount } => match amount {
                Some(amount) => format!("scroll {direction:?} by {amount}"),
                None => format!("scroll {direction:?}"),
            },
            Action::Select { target, value } => {
                format!("select {value:?} in {}", target.selectors)
            }
            Action::Screenshot { name, .. } => {
                format!("screenshot {}", name.as_deref().unwrap_or("page"))
            }
            Action::GoBack => "go back".to_string(),
            Action::GoForward => "go forward".to_string(),
            Action::Reload => "reload".to_string(),
            Action::NewTab { url } => match url {
                Some(url) => format!("open tab {url}"),
                None => "open tab".to_string(),
            },
            Action::SwitchTab { index } => format!("switch to tab {index}"),
            Action::CloseTab { index } => match index {
                Some(index) => format!("close tab {index}"),
                None => "close current tab".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_set_accepts_string_or_list() {
        let single: SelectorSet = serde_json::from_value(json!("#q")).unwrap();
        assert_eq!(single.candidates(), vec!["#q"]);

        let list: SelectorSet = serde_json::from_value(json!(["#q", " ", "input[name=q]"])).unwrap();
        assert_eq!(list.candidates(), vec!["#q", "input[name=q]"]);
        assert_eq!(list.primary(), Some("#q"));
    }

    #[test]
    fn test_promote_keeps_order_and_dedups() {
        let set = SelectorSet::Candidates(vec!["#a".into(), "#b".into(), "#c".into()]);
        let promoted = set.promote(&["#c".to_string(), "#d".to_string()]);
        assert_eq!(promoted.candidates(), vec!["#c", "#d", "#a", "#b"]);
    }

    #[test]
    fn test_action_tagged_json() {
        let action: Action = serde_json::from_value(json!({
            "type": "type",
            "target": { "selectors": ["#q", "textarea[name=q]"], "category": "search" },
            "text": "rust"
        }))
        .unwrap();

        assert_eq!(action.kind(), "type");
        let target = action.target().unwrap();
        assert_eq!(target.category, Some(ElementCategory::Search));
        assert_eq!(target.selectors.len(), 2);

        let back = serde_json::to_value(Action::GoBack).unwrap();
        assert_eq!(back, json!({ "type": "go_back" }));
    }

    #[test]
    fn test_unknown_category_deserializes() {
        let target: ElementTarget =
            serde_json::from_value(json!({ "selectors": "#x", "category": "carousel" })).unwrap();
        assert_eq!(target.category, Some(ElementCategory::Unknown));
    }

    #[test]
    fn test_parse_hint() {
        assert_eq!(ElementCategory::parse_hint("SearchBox"), Some(ElementCategory::Search));
        assert_eq!(ElementCategory::parse_hint("dismiss"), Some(ElementCategory::Close));
        assert_eq!(ElementCategory::parse_hint("carousel"), None);
    }
}
