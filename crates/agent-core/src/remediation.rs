//! Remediation author contract: short DOM scripts that try to unblock a failed step

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::AgentError;
use crate::utils::truncate_chars;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemediationRequest {
    pub step_description: String,
    pub error: String,
    pub url: Option<String>,
    pub dom_excerpt: String,
    pub screenshot_path: Option<PathBuf>,
    /// 1-based iteration of the autonomous recovery loop
    pub iteration: u32,
    /// Outcome of the previous script, if any
    pub previous_outcome: Option<String>,
}

/// Writes a remediation script for a failing step
#[async_trait]
pub trait RemediationAuthor: Send + Sync {
    /// Returns raw model text; use [`extract_script`] to pull the script out.
    async fn author(&self, request: &RemediationRequest) -> Result<String, AgentError>;
}

pub fn remediation_prompt(request: &RemediationRequest, dom_chars: usize) -> String {
    let mut prompt = format!(
        "A browser automation step is blocked.\n\
         Step: {}\nError: {}\nURL: {}\nAttempt: {}\n",
        request.step_description,
        request.error,
        request.url.as_deref().unwrap_or("unknown"),
        request.iteration
    );
    if let Some(previous) = &request.previous_outcome {
        prompt.push_str(&format!("Previous remediation: {previous}\n"));
    }
    prompt.push_str(&format!(
        "\nPage DOM (truncated):\n{}\n\n\
         Write a short JavaScript snippet that changes the page so the step can succeed \
         (close overlays, accept consent banners, scroll elements into view, expand collapsed \
         sections). Only touch the DOM: no network requests, storage, cookies, navigation, \
         eval or new windows. Reply with a single ```js code block.",
        truncate_chars(&request.dom_excerpt, dom_chars)
    ));
    prompt
}

/// Script body from a model reply: the first js/javascript fence, any fence, or the bare text.
pub fn extract_script(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut search = trimmed;
    let mut first_block: Option<String> = None;
    while let Some(start) = search.find("```") {
        let after = &search[start + 3..];
        let newline = after.find('\n').unwrap_or(0);
        let lang = after[..newline].trim().to_lowercase();
        let body_start = &after[newline..];
        let Some(end) = body_start.find("```") else {
            break;
        };
        let body = body_start[..end].trim().to_string();
        if matches!(lang.as_str(), "js" | "javascript") && !body.is_empty() {
            return Some(body);
        }
        if first_block.is_none() && !body.is_empty() {
            first_block = Some(body);
        }
        search = &body_start[end + 3..];
    }

    first_block.or_else(|| {
        if trimmed.contains("```") {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_js_fence() {
        let raw = "Try this:\n```text\nnot code\n```\n```javascript\ndocument.querySelector('.modal')?.remove();\n```";
        assert_eq!(
            extract_script(raw).as_deref(),
            Some("document.querySelector('.modal')?.remove();")
        );
    }

    #[test]
    fn falls_back_to_any_fence_or_bare_text() {
        assert_eq!(extract_script("```\nwindow.scrollTo(0, 0);\n```").as_deref(), Some("window.scrollTo(0, 0);"));
        assert_eq!(extract_script("document.body.click();").as_deref(), Some("document.body.click();"));
        assert!(extract_script("   ").is_none());
        assert!(extract_script("```js\nunterminated").is_none());
    }

    #[test]
    fn prompt_mentions_constraints_and_truncates() {
        let request = RemediationRequest {
            step_description: "Click search".into(),
            error: "not clickable".into(),
            dom_excerpt: "x".repeat(100),
            iteration: 2,
            ..Default::default()
        };
        let prompt = remediation_prompt(&request, 10);
        assert!(prompt.contains("Attempt: 2"));
        assert!(prompt.contains("no network requests"));
        assert!(!prompt.contains(&"x".repeat(11)));
    }
}
