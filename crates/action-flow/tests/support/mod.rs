#![allow(dead_code)]

use action_locator::{ElementProbe, Locator, LocatorError};
use action_primitives::{ActionError, ActionReport, BrowserDriver, ScreenshotOptions};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use surefoot_core_types::{Action, ElementTarget, Plan, Step};

type FailRule = Box<dyn Fn(&Action) -> bool + Send + Sync>;

/// In-memory browser: records every call and fails matching actions a fixed number of times.
pub struct ScriptedDriver {
    actions: Mutex<Vec<Action>>,
    evaluated: Mutex<Vec<String>>,
    fail_rule: FailRule,
    remaining_failures: AtomicUsize,
    failure: ActionError,
    evaluate_result: Value,
    ready: bool,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            evaluated: Mutex::new(Vec::new()),
            fail_rule: Box::new(|_| false),
            remaining_failures: AtomicUsize::new(0),
            failure: ActionError::WaitTimeout("element did not appear".into()),
            evaluate_result: Value::Null,
            ready: true,
        }
    }

    /// Clicks fail `count` times; `usize::MAX` fails forever.
    pub fn failing_clicks(count: usize) -> Self {
        Self::new().fail_when(|action| matches!(action, Action::Click { .. }), count)
    }

    pub fn fail_when<F>(mut self, rule: F, count: usize) -> Self
    where
        F: Fn(&Action) -> bool + Send + Sync + 'static,
    {
        self.fail_rule = Box::new(rule);
        self.remaining_failures = AtomicUsize::new(count);
        self
    }

    pub fn with_error(mut self, error: ActionError) -> Self {
        self.failure = error;
        self
    }

    pub fn with_evaluate_result(mut self, value: Value) -> Self {
        self.evaluate_result = value;
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.actions.lock().iter().filter(|a| a.kind() == kind).count()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().clone()
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn ensure_ready(&self) -> Result<(), ActionError> {
        if self.ready {
            Ok(())
        } else {
            Err(ActionError::Initialization("chrome not found".into()))
        }
    }

    async fn execute_action(&self, action: &Action) -> Result<ActionReport, ActionError> {
        self.actions.lock().push(action.clone());
        if (self.fail_rule)(action) {
            let remaining = self.remaining_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                if remaining != usize::MAX {
                    self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
                }
                return Err(self.failure.clone());
            }
        }
        let report = ActionReport::success(Utc::now());
        match action {
            Action::Screenshot { name, .. } => Ok(report.with_screenshot(PathBuf::from(format!(
                "shots/{}.png",
                name.as_deref().unwrap_or("page")
            )))),
            _ => Ok(report),
        }
    }

    async fn take_screenshot(
        &self,
        name: &str,
        _options: ScreenshotOptions,
    ) -> Result<PathBuf, ActionError> {
        Ok(PathBuf::from(format!("shots/{name}.png")))
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        Ok("https://example.com/".to_string())
    }

    async fn page_html(&self) -> Result<String, ActionError> {
        Ok("<html><body><button id=\"go\">Go</button></body></html>".to_string())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError> {
        self.evaluated.lock().push(script.to_string());
        Ok(self.evaluate_result.clone())
    }
}

/// Page where exactly the listed locators exist and are visible
pub struct VisibleProbe(pub Vec<String>);

#[async_trait]
impl ElementProbe for VisibleProbe {
    async fn count(&self, locator: &Locator) -> Result<usize, LocatorError> {
        Ok(usize::from(self.0.contains(&locator.to_string())))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, LocatorError> {
        Ok(self.0.contains(&locator.to_string()))
    }
}

pub fn click(selectors: &[&str]) -> Action {
    Action::click(ElementTarget::candidates(selectors.iter().copied()))
}

pub fn three_step_plan() -> Plan {
    Plan::with_steps(
        "Open the page and press go",
        vec![
            Step::new(
                "Open example.com",
                Action::Navigate {
                    url: "https://example.com".into(),
                },
            ),
            Step::new("Click go", click(&["#go"])),
            Step::new(
                "Capture the result",
                Action::Screenshot {
                    name: Some("result".into()),
                    full_page: false,
                },
            ),
        ],
    )
}

pub fn waits(plan: &Plan) -> usize {
    plan.steps
        .iter()
        .filter(|step| matches!(step.action, Some(Action::Wait { .. })))
        .count()
}
