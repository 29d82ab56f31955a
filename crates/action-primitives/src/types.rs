//! Core data types for the driver contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Post-action signals captured after execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostSignals {
    /// URL after action (if known)
    pub url_after: Option<String>,

    /// Title after action (if known)
    pub title_after: Option<String>,
}

/// Populated when the resolver matched something other than the primary candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfHealInfo {
    /// Primary candidate that did not match
    pub original_anchor: String,

    /// Candidate or heuristic that matched
    pub healed_anchor: String,

    /// `explicit` or `heuristic:<category>`
    pub strategy: String,
}

/// Report of a successful driver action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    /// When the action started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    /// When the action finished
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,

    /// Post-execution signals
    pub post_signals: PostSignals,

    /// Screenshot written by the action, if any
    pub screenshot: Option<PathBuf>,

    /// Self-heal information (if resolution fell back)
    pub self_heal: Option<SelfHealInfo>,
}

impl ActionReport {
    /// Create a report for an action that started at `started_at`
    pub fn success(started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        let latency_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            started_at,
            finished_at,
            latency_ms,
            post_signals: PostSignals::default(),
            screenshot: None,
            self_heal: None,
        }
    }

    /// Add post signals
    pub fn with_signals(mut self, signals: PostSignals) -> Self {
        self.post_signals = signals;
        self
    }

    pub fn with_screenshot(mut self, path: PathBuf) -> Self {
        self.screenshot = Some(path);
        self
    }

    /// Add self-heal information
    pub fn with_heal(mut self, heal: SelfHealInfo) -> Self {
        self.self_heal = Some(heal);
        self
    }
}

/// Screenshot options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    pub full_page: bool,
}

impl ScreenshotOptions {
    pub fn full_page() -> Self {
        Self { full_page: true }
    }
}

/// Page state captured after a failure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureContext {
    pub html: String,
    pub screenshot_path: Option<PathBuf>,
    pub url: Option<String>,
}

/// File-name-safe slug of a step description
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= 48 {
            break;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "step".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Click the 'Search' button!"), "click-the-search-button");
        assert_eq!(slugify("  ??  "), "step");
    }

    #[test]
    fn test_report_latency_non_negative() {
        let report = ActionReport::success(Utc::now());
        assert!(report.finished_at >= report.started_at);
        assert!(report.screenshot.is_none());
    }
}
