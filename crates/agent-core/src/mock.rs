use async_trait::async_trait;
use std::path::Path;

use crate::descriptor::StepDescriptor;
use crate::errors::AgentError;
use crate::planner::{FailureAnalysis, TaskPlanner};
use crate::remediation::{RemediationAuthor, RemediationRequest};
use crate::vision::VisionAnalyzer;

const DEFAULT_VISION_RESPONSE: &str = "```json\n{\"failure_reason\": \"unknown\", \
\"captcha\": {\"present\": false}, \"page_state\": \"unchanged\"}\n```";

/// Deterministic provider used for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct MockLlmProvider {
    vision_response: Option<String>,
    remediation_script: Option<String>,
    reanalysis: Option<Vec<String>>,
    alternative: Option<StepDescriptor>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text returned from every vision call
    pub fn with_vision_response(mut self, response: impl Into<String>) -> Self {
        self.vision_response = Some(response.into());
        self
    }

    /// Script returned (fenced) from every remediation call
    pub fn with_remediation_script(mut self, script: impl Into<String>) -> Self {
        self.remediation_script = Some(script.into());
        self
    }

    pub fn with_reanalysis(mut self, selectors: Vec<String>) -> Self {
        self.reanalysis = Some(selectors);
        self
    }

    pub fn with_alternative(mut self, step: StepDescriptor) -> Self {
        self.alternative = Some(step);
        self
    }
}

fn ensure_task(task: &str) -> Result<(), AgentError> {
    if task.trim().is_empty() {
        return Err(AgentError::invalid_request("task cannot be empty"));
    }
    Ok(())
}

/// `"search for rust"` -> `Some("rust")`
fn search_query(task: &str) -> Option<String> {
    let lowered = task.to_lowercase();
    let marker = "search for ";
    let start = lowered.find(marker)? + marker.len();
    let query = task.get(start..)?.trim().trim_matches(|c| c == '"' || c == '\'');
    if query.is_empty() {
        None
    } else {
        Some(query.to_string())
    }
}

#[async_trait]
impl TaskPlanner for MockLlmProvider {
    async fn plan(&self, task: &str, current_url: &str) -> Result<Vec<StepDescriptor>, AgentError> {
        ensure_task(task)?;
        let mut steps = vec![
            StepDescriptor::new(format!("Open {current_url}"), "navigate").with_url(current_url),
            StepDescriptor::new("Let the page settle", "wait").with_wait(1000),
        ];
        if let Some(query) = search_query(task) {
            steps.push(
                StepDescriptor::new(format!("Type '{query}' into the search box"), "type")
                    .with_selectors(["input[name=q]", "textarea[name=q]"])
                    .with_category("search")
                    .with_value(query),
            );
            let mut submit = StepDescriptor::new("Submit the search", "press");
            submit.key = Some("Enter".to_string());
            steps.push(submit);
            steps.push(StepDescriptor::new("Wait for results", "wait").with_wait(1500));
        }
        steps.push(StepDescriptor::new("Capture the result", "screenshot").with_value("result"));
        Ok(steps)
    }

    async fn reanalyze_failure(
        &self,
        _analysis: &FailureAnalysis,
    ) -> Result<Option<Vec<String>>, AgentError> {
        Ok(self.reanalysis.clone())
    }

    async fn suggest_alternative(
        &self,
        _analysis: &FailureAnalysis,
    ) -> Result<Option<StepDescriptor>, AgentError> {
        Ok(self.alternative.clone())
    }

    async fn summarize_intent(&self, task: &str, completed: &[String]) -> Result<String, AgentError> {
        ensure_task(task)?;
        Ok(match completed.last() {
            Some(last) => format!(
                "{task} ({} step(s) done, last: {last})",
                completed.len()
            ),
            None => task.to_string(),
        })
    }
}

#[async_trait]
impl VisionAnalyzer for MockLlmProvider {
    async fn analyze(
        &self,
        _screenshot: &Path,
        prompt: &str,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> Result<String, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::invalid_request("prompt cannot be empty"));
        }
        Ok(self
            .vision_response
            .clone()
            .unwrap_or_else(|| DEFAULT_VISION_RESPONSE.to_string()))
    }
}

#[async_trait]
impl RemediationAuthor for MockLlmProvider {
    async fn author(&self, _request: &RemediationRequest) -> Result<String, AgentError> {
        self.remediation_script
            .as_ref()
            .map(|script| format!("```js\n{script}\n```"))
            .ok_or_else(|| AgentError::unavailable("mock provider has no remediation script"))
    }
}
