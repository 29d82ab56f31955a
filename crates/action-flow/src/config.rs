//! Tunables for the controller and recovery ladder.

use action_primitives::ScriptPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Controller-level failures per step before the persistent-failure pass.
    /// Default: 5
    pub max_retries: u32,

    /// Iteration bound of the autonomous remediation loop (tier 2).
    /// Default: 10
    pub autonomous_max_iterations: u32,

    /// Key sent by the quick-dismiss tier.
    /// Default: "Escape"
    pub quick_dismiss_key: String,

    /// Pause after quick dismiss and overlay dismissal, in milliseconds.
    /// Default: 1000
    pub stabilization_wait_ms: u64,

    /// Duration of wait steps inserted by recovery, in milliseconds.
    /// Default: 2000
    pub inserted_wait_ms: u64,

    /// Evaluation bound for one remediation script, in milliseconds.
    /// Default: 5000
    pub remediation_timeout_ms: u64,

    /// DOM characters sent to collaborators.
    /// Default: 4000
    pub dom_excerpt_chars: usize,

    /// CAPTCHA solution steps are used only above this confidence.
    /// Default: 0.5
    pub captcha_confidence_threshold: f64,

    /// Recovery steps that may be inserted on behalf of one step.
    /// Default: 8
    pub max_inserted_steps: usize,

    /// Step count after which the first intent summary is taken.
    /// Default: 3
    pub summary_checkpoint_step: usize,

    /// Directory for the replay artifact; disabled when unset.
    /// Default: None
    pub artifact_dir: Option<PathBuf>,

    /// Envelope for remediation scripts.
    pub script_policy: ScriptPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            autonomous_max_iterations: 10,
            quick_dismiss_key: "Escape".to_string(),
            stabilization_wait_ms: 1000,
            inserted_wait_ms: 2000,
            remediation_timeout_ms: 5000,
            dom_excerpt_chars: 4000,
            captcha_confidence_threshold: 0.5,
            max_inserted_steps: 8,
            summary_checkpoint_step: 3,
            artifact_dir: None,
            script_policy: ScriptPolicy::default(),
        }
    }
}

impl ExecutionConfig {
    /// Create a minimal config for simple tasks.
    pub fn minimal() -> Self {
        Self {
            max_retries: 2,
            autonomous_max_iterations: 2,
            max_inserted_steps: 2,
            ..Default::default()
        }
    }

    /// Create a config with no pauses, for tests and dry runs.
    pub fn fast() -> Self {
        Self {
            stabilization_wait_ms: 0,
            inserted_wait_ms: 0,
            remediation_timeout_ms: 500,
            ..Default::default()
        }
    }

    /// Builder: set max retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder: set autonomous recovery iteration bound.
    pub fn with_autonomous_iterations(mut self, iterations: u32) -> Self {
        self.autonomous_max_iterations = iterations;
        self
    }

    /// Builder: set stabilization wait.
    pub fn with_stabilization_wait(mut self, wait_ms: u64) -> Self {
        self.stabilization_wait_ms = wait_ms;
        self
    }

    /// Builder: set inserted wait duration.
    pub fn with_inserted_wait(mut self, wait_ms: u64) -> Self {
        self.inserted_wait_ms = wait_ms;
        self
    }

    /// Builder: set the per-step recovery insertion budget.
    pub fn with_max_inserted_steps(mut self, max_inserted_steps: usize) -> Self {
        self.max_inserted_steps = max_inserted_steps;
        self
    }

    /// Builder: set the replay artifact directory.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Builder: set the remediation script policy.
    pub fn with_script_policy(mut self, policy: ScriptPolicy) -> Self {
        self.script_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutionConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.autonomous_max_iterations, 10);
        assert_eq!(config.quick_dismiss_key, "Escape");
        assert_eq!(config.captcha_confidence_threshold, 0.5);
        assert!(config.artifact_dir.is_none());
    }

    #[test]
    fn test_presets_and_builders() {
        let config = ExecutionConfig::fast()
            .with_max_retries(3)
            .with_autonomous_iterations(1)
            .with_artifact_dir("/tmp/seq");
        assert_eq!(config.stabilization_wait_ms, 0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.autonomous_max_iterations, 1);
        assert!(config.artifact_dir.is_some());
        assert_eq!(ExecutionConfig::minimal().max_retries, 2);
    }

    #[test]
    fn test_partial_yaml_like_json() {
        let config: ExecutionConfig =
            serde_json::from_value(serde_json::json!({ "max_retries": 7 })).unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.inserted_wait_ms, 2000);
    }
}
