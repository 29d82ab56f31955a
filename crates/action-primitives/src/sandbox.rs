//! DOM-only envelope for remediation scripts
//!
//! Remediation scripts come from an external text generator and are untrusted. A script is
//! accepted only if it is short and free of network, storage, cookie, dynamic-code, navigation
//! and window-opening tokens. Accepted scripts run inside a wrapper that shadows those globals
//! and converts exceptions into a `{ ok, error }` record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ActionError;

/// Globals shadowed inside the wrapper. `eval` is legal as a parameter name in sloppy mode only,
/// so the wrapper must never opt into strict mode.
const SHADOWED_GLOBALS: &[&str] = &[
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "EventSource",
    "eval",
    "Function",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "open",
    "importScripts",
];

const DEFAULT_FORBIDDEN: &[&str] = &[
    "fetch(",
    "XMLHttpRequest",
    "WebSocket",
    "EventSource",
    "sendBeacon",
    "eval(",
    "Function(",
    "import(",
    "importScripts",
    "setTimeout(\"",
    "setTimeout('",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "document.cookie",
    "caches.",
    "window.open",
    "location.href=",
    "location.assign",
    "location.replace",
    "location.reload",
    "window.location=",
    "document.location=",
    "history.",
    "document.write",
    "postMessage",
    "serviceWorker",
    "navigator.credentials",
    "globalThis",
    "constructor.constructor",
];

/// Limits applied to remediation scripts before evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPolicy {
    /// Maximum script length in bytes
    pub max_len: usize,

    /// Substrings that cause rejection; compared with whitespace removed
    pub forbidden_tokens: Vec<String>,
}

impl Default for ScriptPolicy {
    fn default() -> Self {
        Self {
            max_len: 4096,
            forbidden_tokens: DEFAULT_FORBIDDEN.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScriptPolicy {
    /// First policy violation in `source`, if any
    pub fn violation(&self, source: &str) -> Option<String> {
        if source.trim().is_empty() {
            return Some("script is empty".to_string());
        }
        if source.len() > self.max_len {
            return Some(format!(
                "script is {} bytes, limit is {}",
                source.len(),
                self.max_len
            ));
        }
        let compact = strip_whitespace(source);
        self.forbidden_tokens
            .iter()
            .find(|token| compact.contains(strip_whitespace(token).as_str()))
            .map(|token| format!("forbidden token `{token}`"))
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A remediation script that passed [`ScriptPolicy`] screening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedScript {
    source: String,
}

impl SandboxedScript {
    pub fn prepare(source: &str, policy: &ScriptPolicy) -> Result<Self, ActionError> {
        if let Some(reason) = policy.violation(source) {
            return Err(ActionError::ScriptRejected(reason));
        }
        Ok(Self {
            source: source.trim().to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Expression evaluating to `{ ok, error }`
    pub fn wrapped(&self) -> String {
        let params = SHADOWED_GLOBALS.join(", ");
        format!(
            "(function ({params}) {{\n  try {{\n    (function () {{\n{body}\n    }})();\n    \
             return {{ ok: true, error: null }};\n  }} catch (err) {{\n    \
             return {{ ok: false, error: String((err && err.message) || err) }};\n  }}\n}})()",
            params = params,
            body = self.source
        )
    }
}

/// Result record produced by [`SandboxedScript::wrapped`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxOutcome {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl SandboxOutcome {
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<SandboxOutcome>(value) {
            Ok(outcome) => outcome,
            Err(err) => SandboxOutcome {
                ok: false,
                error: Some(format!("unexpected sandbox result: {err}")),
            },
        }
    }

    pub fn into_result(self) -> Result<(), ActionError> {
        if self.ok {
            Ok(())
        } else {
            Err(ActionError::ScriptFailed(
                self.error.unwrap_or_else(|| "script failed".to_string()),
            ))
        }
    }
}
