//! OpenAI-compatible chat-completions provider implementing every collaborator contract

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::descriptor::StepDescriptor;
use crate::errors::AgentError;
use crate::planner::{FailureAnalysis, TaskPlanner};
use crate::remediation::{remediation_prompt, RemediationAuthor, RemediationRequest};
use crate::utils::{extract_json_object, truncate_chars};
use crate::vision::VisionAnalyzer;

const PLANNER_SYSTEM_PROMPT: &str = "You decompose browser tasks into an ordered list of steps. \
Reply with a JSON object {\"steps\": [...]} where each step has description, action_type \
(navigate, click, type, press, wait, scroll, select, screenshot, go_back, go_forward, reload, \
new_tab, switch_tab, close_tab), selectors (ordered most specific first), value, wait_time, url, \
key and category (search, button, submit, input, link, checkbox, select, close) as needed.";

const HTML_EXCERPT_CHARS: usize = 6000;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub vision_model: Option<String>,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            vision_model: None,
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        if config.api_keys.is_empty() {
            return Err(AgentError::invalid_request("missing API key for provider"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { client, config })
    }

    /// Send one chat completion, rotating API keys on HTTP 429.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        json_mode: bool,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let mut last_error: Option<AgentError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let body = ChatCompletionRequest {
                model: model.to_string(),
                temperature: temperature.unwrap_or(self.config.temperature),
                max_tokens,
                response_format: json_mode.then(|| ResponseFormat {
                    r#type: "json_object".to_string(),
                }),
                messages: messages.clone(),
            };

            let response = match self.client.post(&url).bearer_auth(key).json(&body).send().await
            {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::provider(format!("request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "rate limited; switching API key"
                    );
                    last_error = Some(AgentError::provider(friendly));
                    continue;
                }
                return Err(AgentError::provider(format!("provider returned {status}: {text}")));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| AgentError::parse(format!("response invalid: {err}")))?;

            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| AgentError::parse("response missing content"));
        }

        Err(last_error.unwrap_or_else(|| AgentError::provider("request exhausted all API keys")))
    }

    async fn complete_json(&self, system: &str, user: String) -> Result<Value, AgentError> {
        let content = self
            .complete(
                &self.config.model,
                vec![ChatMessage::text("system", system), ChatMessage::text("user", user)],
                true,
                None,
                None,
            )
            .await?;
        let json = extract_json_object(&content)
            .ok_or_else(|| AgentError::parse("response missing JSON object"))?;
        serde_json::from_str(&json).map_err(|err| AgentError::parse(err.to_string()))
    }
}

fn failure_summary(analysis: &FailureAnalysis) -> String {
    format!(
        "Task: {}\nFailing step: {}\nAction: {}\nError: {}\nAttempts: {}\nURL: {}\n\nHTML:\n{}",
        analysis.task,
        analysis.step_description,
        analysis
            .action
            .as_ref()
            .map(|a| a.describe())
            .unwrap_or_else(|| "none".to_string()),
        analysis.error,
        analysis.attempts,
        analysis.url.as_deref().unwrap_or("unknown"),
        truncate_chars(&analysis.html_excerpt, HTML_EXCERPT_CHARS)
    )
}

#[async_trait]
impl TaskPlanner for OpenAiProvider {
    async fn plan(&self, task: &str, current_url: &str) -> Result<Vec<StepDescriptor>, AgentError> {
        let value = self
            .complete_json(
                PLANNER_SYSTEM_PROMPT,
                format!("Task: {task}\nStarting URL: {current_url}"),
            )
            .await?;
        let steps = value.get("steps").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(steps).map_err(|err| AgentError::parse(format!("plan steps: {err}")))
    }

    async fn reanalyze_failure(
        &self,
        analysis: &FailureAnalysis,
    ) -> Result<Option<Vec<String>>, AgentError> {
        let value = self
            .complete_json(
                "You repair CSS selectors for browser automation. Reply with JSON \
                 {\"selectors\": [string]} ordered most specific first, or {\"selectors\": []} \
                 if the element is not on the page.",
                failure_summary(analysis),
            )
            .await?;
        let selectors: Vec<String> = value
            .get("selectors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .filter(|s| !s.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(if selectors.is_empty() { None } else { Some(selectors) })
    }

    async fn suggest_alternative(
        &self,
        analysis: &FailureAnalysis,
    ) -> Result<Option<StepDescriptor>, AgentError> {
        let value = self
            .complete_json(
                "Suggest one different browser step that achieves the same goal as the failing \
                 step. Reply with JSON {\"step\": {description, action_type, selectors, value}} \
                 or {\"step\": null}.",
                failure_summary(analysis),
            )
            .await?;
        match value.get("step") {
            None | Some(Value::Null) => Ok(None),
            Some(step) => serde_json::from_value(step.clone())
                .map(Some)
                .map_err(|err| AgentError::parse(format!("alternative step: {err}"))),
        }
    }

    async fn summarize_intent(&self, task: &str, completed: &[String]) -> Result<String, AgentError> {
        let content = self
            .complete(
                &self.config.model,
                vec![
                    ChatMessage::text(
                        "system",
                        "Summarize in one sentence what the automation has accomplished so far \
                         and what it is trying to do next.",
                    ),
                    ChatMessage::text(
                        "user",
                        format!("Task: {task}\nCompleted steps:\n- {}", completed.join("\n- ")),
                    ),
                ],
                false,
                Some(120),
                None,
            )
            .await?;
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAiProvider {
    async fn analyze(
        &self,
        screenshot: &Path,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, AgentError> {
        let bytes = tokio::fs::read(screenshot).await.map_err(|err| {
            AgentError::invalid_request(format!(
                "cannot read screenshot {}: {err}",
                screenshot.display()
            ))
        })?;
        debug!(path = %screenshot.display(), bytes = bytes.len(), "sending screenshot for analysis");
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(bytes));
        let model = self
            .config
            .vision_model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        self.complete(
            &model,
            vec![ChatMessage {
                role: "user".to_string(),
                content: json!([
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]),
            }],
            false,
            Some(max_tokens.unwrap_or(1000)),
            temperature,
        )
        .await
    }
}

#[async_trait]
impl RemediationAuthor for OpenAiProvider {
    async fn author(&self, request: &RemediationRequest) -> Result<String, AgentError> {
        self.complete(
            &self.config.model,
            vec![
                ChatMessage::text(
                    "system",
                    "You write minimal DOM-only JavaScript to unblock browser automation.",
                ),
                ChatMessage::text("user", remediation_prompt(request, HTML_EXCERPT_CHARS)),
            ],
            false,
            Some(600),
            Some(0.1),
        )
        .await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: Value,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Value::String(content.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("rate limit exceeded: {}", message.trim());
        }
    }
    "rate limit exceeded; retry later".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        assert!(OpenAiProvider::new(OpenAiConfig::default()).is_err());
    }

    #[test]
    fn content_parts_are_joined() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": [{ "type": "text", "text": "a" }, { "text": "b" }] } }]
        }))
        .unwrap();
        assert_eq!(response.choices[0].message.content.as_text().as_deref(), Some("a\nb"));
    }

    #[test]
    fn rate_limit_message_prefers_envelope() {
        assert_eq!(
            rate_limit_message(r#"{"error":{"message":" slow down "}}"#),
            "rate limit exceeded: slow down"
        );
        assert_eq!(rate_limit_message("nope"), "rate limit exceeded; retry later");
    }

    #[test]
    fn request_omits_unset_fields() {
        let body = ChatCompletionRequest {
            model: "m".into(),
            temperature: 0.0,
            max_tokens: None,
            response_format: None,
            messages: vec![ChatMessage::text("user", "hi")],
        };
        let value = serde_json::to_value(body).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["content"], "hi");
    }
}
