//! Vision collaborator contract and lenient diagnosis parsing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use surefoot_core_types::Step;

use crate::descriptor::StepDescriptor;
use crate::errors::AgentError;
use crate::utils::{extract_json_object, truncate_chars};

/// Multimodal analysis of a screenshot
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        screenshot: &Path,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, AgentError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaReport {
    pub present: bool,
    #[serde(alias = "type")]
    pub kind: Option<String>,
    pub confidence: f64,
    #[serde(alias = "solutionSteps", alias = "solution")]
    pub solution_steps: Vec<StepDescriptor>,
}

/// Structured answer requested from the vision collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionDiagnosis {
    #[serde(alias = "failureReason", alias = "reason")]
    pub failure_reason: Option<String>,
    pub captcha: CaptchaReport,
    #[serde(alias = "alternativeAction", alias = "suggestedAction", alias = "suggested_action")]
    pub alternative_action: Option<StepDescriptor>,
    #[serde(alias = "pageState")]
    pub page_state: Option<String>,
}

impl VisionDiagnosis {
    /// CAPTCHA solving steps, when reported above `threshold` with at least one usable step
    pub fn captcha_steps(&self, threshold: f64) -> Option<Vec<Step>> {
        if !self.captcha.present || self.captcha.confidence <= threshold {
            return None;
        }
        let steps: Vec<Step> = self
            .captcha
            .solution_steps
            .iter()
            .filter_map(|descriptor| match descriptor.to_action() {
                Ok(Some(action)) => Some(Step::new(
                    if descriptor.description.is_empty() {
                        action.describe()
                    } else {
                        descriptor.description.clone()
                    },
                    action,
                )),
                _ => None,
            })
            .collect();
        if steps.is_empty() {
            None
        } else {
            Some(steps)
        }
    }
}

/// Prompt requesting the structured diagnosis contract
pub fn diagnosis_prompt(step_description: &str, error: &str, html: &str, html_chars: usize) -> String {
    format!(
        "A browser automation step failed.\n\
         Step: {step_description}\n\
         Error: {error}\n\n\
         Page HTML (truncated):\n{html}\n\n\
         Look at the screenshot and answer with a single JSON object:\n\
         {{\n  \"failure_reason\": string,\n  \"captcha\": {{ \"present\": bool, \"type\": string|null, \
         \"confidence\": number 0..1, \"solution_steps\": [{{ \"description\": string, \"action_type\": \
         \"click\"|\"type\", \"selectors\": [string], \"value\": string|null }}] }},\n  \
         \"alternative_action\": {{ \"description\": string, \"action_type\": string, \"selectors\": \
         [string], \"value\": string|null }} | null,\n  \"page_state\": string\n}}",
        html = truncate_chars(html, html_chars)
    )
}

/// Parse a free-text vision response. Fenced, embedded and bare JSON are accepted.
pub fn parse_diagnosis(raw: &str) -> Result<VisionDiagnosis, AgentError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AgentError::parse("vision response contained no JSON object"))?;
    serde_json::from_str(&json).map_err(|err| AgentError::parse(format!("vision JSON: {err}")))
}
