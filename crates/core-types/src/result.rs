use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::plan::{Plan, Step};

/// Outcome of one executed (or abandoned, or skipped) step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_index: usize,
    pub step: Step,
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub attempts: u32,
}

impl StepResult {
    pub fn success(step_index: usize, step: Step, duration_ms: u64, attempts: u32) -> Self {
        Self {
            step_index,
            step,
            success: true,
            skipped: false,
            error: None,
            duration_ms,
            attempts,
        }
    }

    pub fn failure(
        step_index: usize,
        step: Step,
        error: impl Into<String>,
        duration_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            step_index,
            step,
            success: false,
            skipped: false,
            error: Some(error.into()),
            duration_ms,
            attempts,
        }
    }

    pub fn skipped(
        step_index: usize,
        step: Step,
        reason: impl Into<String>,
        duration_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            skipped: true,
            ..Self::failure(step_index, step, reason, duration_ms, attempts)
        }
    }
}

/// Record produced once per run.
///
/// `success` reports whether the run reached its end; per-step outcomes live in `step_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub final_plan: Plan,
    pub elapsed_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub screenshots: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub step_results: Vec<StepResult>,
    pub action_trace: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_artifact_path: Option<PathBuf>,
}

impl ExecutionResult {
    pub fn succeeded_steps(&self) -> usize {
        self.step_results.iter().filter(|r| r.success).count()
    }

    pub fn failed_steps(&self) -> usize {
        self.step_results
            .iter()
            .filter(|r| !r.success && !r.skipped)
            .count()
    }

    pub fn skipped_steps(&self) -> usize {
        self.step_results.iter().filter(|r| r.skipped).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_distinguish_skipped_from_failed() {
        let step = Step::note("x");
        let now = Utc::now();
        let result = ExecutionResult {
            success: true,
            final_plan: Plan::new("p"),
            elapsed_ms: 10,
            started_at: now,
            finished_at: now,
            screenshots: vec![],
            errors: vec!["step 2 abandoned".into()],
            step_results: vec![
                StepResult::success(0, step.clone(), 5, 1),
                StepResult::failure(1, step.clone(), "boom", 5, 6),
                StepResult::skipped(2, step, "skip-step", 1, 2),
            ],
            action_trace: vec![],
            generated_artifact_path: None,
        };

        assert_eq!(result.succeeded_steps(), 1);
        assert_eq!(result.failed_steps(), 1);
        assert_eq!(result.skipped_steps(), 1);
        assert!(result.to_json().unwrap().contains("\"skipped\": true"));
    }
}
