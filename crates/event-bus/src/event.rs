use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    StepStart,
    StepComplete,
    StepFailed,
    Retry,
    Analysis,
}

impl ProgressEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEventKind::StepStart => "step_start",
            ProgressEventKind::StepComplete => "step_complete",
            ProgressEventKind::StepFailed => "step_failed",
            ProgressEventKind::Retry => "retry",
            ProgressEventKind::Analysis => "analysis",
        }
    }
}

/// Typed notification emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressEventKind,
    pub step_index: usize,
    pub total_steps: usize,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        kind: ProgressEventKind,
        step_index: usize,
        total_steps: usize,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            step_index,
            total_steps,
            description: description.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn step_start(step_index: usize, total_steps: usize, description: impl Into<String>) -> Self {
        Self::new(ProgressEventKind::StepStart, step_index, total_steps, description)
    }

    pub fn step_complete(
        step_index: usize,
        total_steps: usize,
        description: impl Into<String>,
    ) -> Self {
        Self::new(ProgressEventKind::StepComplete, step_index, total_steps, description)
    }

    pub fn step_failed(step_index: usize, total_steps: usize, description: impl Into<String>) -> Self {
        Self::new(ProgressEventKind::StepFailed, step_index, total_steps, description)
    }

    pub fn retry(step_index: usize, total_steps: usize, description: impl Into<String>) -> Self {
        Self::new(ProgressEventKind::Retry, step_index, total_steps, description)
    }

    pub fn analysis(step_index: usize, total_steps: usize, description: impl Into<String>) -> Self {
        Self::new(ProgressEventKind::Analysis, step_index, total_steps, description)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
