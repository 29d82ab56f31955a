//! Planner collaborator contract and the bootstrap fallback plan

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surefoot_core_types::{Action, Plan, Step};
use tracing::{info, warn};

use crate::descriptor::StepDescriptor;
use crate::errors::AgentError;

/// Context handed to the planner when a step keeps failing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub task: String,
    pub step_description: String,
    pub action: Option<Action>,
    pub error: String,
    pub url: Option<String>,
    /// Truncated page HTML
    pub html_excerpt: String,
    pub attempts: u32,
}

/// Abstraction over planners so multiple vendors can plug into the engine.
#[async_trait]
pub trait TaskPlanner: Send + Sync {
    /// Decompose a task into zero or more step descriptors.
    async fn plan(&self, task: &str, current_url: &str) -> Result<Vec<StepDescriptor>, AgentError>;

    /// Heavier re-analysis after retries are exhausted; may propose a replacement selector set.
    async fn reanalyze_failure(
        &self,
        analysis: &FailureAnalysis,
    ) -> Result<Option<Vec<String>>, AgentError> {
        let _ = analysis;
        Ok(None)
    }

    /// Propose a different way to achieve the failing step.
    async fn suggest_alternative(
        &self,
        analysis: &FailureAnalysis,
    ) -> Result<Option<StepDescriptor>, AgentError> {
        let _ = analysis;
        Ok(None)
    }

    /// One-line summary of the intent behind the steps completed so far.
    async fn summarize_intent(&self, task: &str, completed: &[String]) -> Result<String, AgentError>;
}

/// Fixed plan used when no planner is available: navigate, settle, screenshot.
pub fn bootstrap_plan(task: &str, url: &str) -> Plan {
    Plan::with_steps(
        task,
        vec![
            Step::new(
                format!("Navigate to {url}"),
                Action::Navigate {
                    url: url.to_string(),
                },
            ),
            Step::new("Wait for the page to load", Action::wait(2000)),
            Step::new(
                "Capture the initial page",
                Action::Screenshot {
                    name: Some("initial".to_string()),
                    full_page: false,
                },
            ),
        ],
    )
}

/// Ask the planner for a plan, falling back to [`bootstrap_plan`] when it is missing, fails,
/// or returns nothing usable.
pub async fn plan_or_bootstrap(planner: Option<&dyn TaskPlanner>, task: &str, url: &str) -> Plan {
    let Some(planner) = planner else {
        info!("no planner configured; using bootstrap plan");
        return bootstrap_plan(task, url);
    };

    match planner.plan(task, url).await {
        Ok(descriptors) => {
            let steps: Vec<Step> = descriptors.into_iter().map(StepDescriptor::into_step).collect();
            if steps.iter().all(|step| step.action.is_none()) {
                warn!(count = steps.len(), "planner returned no usable steps; using bootstrap plan");
                return bootstrap_plan(task, url);
            }
            info!(steps = steps.len(), "planner produced plan");
            Plan::with_steps(task, steps)
        }
        Err(err) => {
            warn!(error = %err, "planner unavailable; using bootstrap plan");
            bootstrap_plan(task, url)
        }
    }
}
