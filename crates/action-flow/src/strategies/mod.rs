//! Recovery escalation ladder
//!
//! Tiers run cheapest first. Each tier either answers with a [`LadderOutcome`] or returns `None`
//! to hand the failure to the next tier. When every tier declines, the option deferred by the
//! structured tier is applied, and failing that the step is skipped.

mod autonomous;
mod quick_dismiss;
mod structured;
mod vision;

pub use autonomous::AutonomousRecovery;
pub use quick_dismiss::QuickDismiss;
pub use structured::StructuredRecovery;
pub use vision::VisionDiagnostic;

use action_primitives::{ActionError, ActionReport};
use agent_core::{truncate_chars, FailureAnalysis};
use async_trait::async_trait;
use serde_json::{json, Value};
use surefoot_core_types::{Action, Plan, PlanError, Step, StepId};
use surefoot_event_bus::ProgressEvent;
use tracing::{debug, info};

use crate::config::ExecutionConfig;
use crate::env::Collaborators;
use crate::run::RunState;
use crate::types::{LadderOutcome, RecoveryOption, RecoveryTier};

/// One rung of the ladder
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn tier(&self) -> RecoveryTier;

    /// Whether the collaborators this tier needs are configured
    fn is_available(&self, ctx: &RecoveryContext<'_>) -> bool {
        let _ = ctx;
        true
    }

    /// Try to recover; `None` escalates to the next tier.
    async fn attempt(&self, ctx: &mut RecoveryContext<'_>) -> Option<LadderOutcome>;
}

/// Everything a tier may read or change while handling one failure
pub struct RecoveryContext<'a> {
    pub plan: &'a mut Plan,
    pub index: usize,
    pub step_id: StepId,
    pub description: String,
    /// Most recent error; tiers replace it when their own retry fails
    pub error: ActionError,
    pub run: &'a mut RunState,
    pub env: &'a Collaborators,
    pub config: &'a ExecutionConfig,
    pub task: &'a str,
    /// Structured option held back while the vision tier gets a chance
    pub fallback: Option<RecoveryOption>,
}

impl<'a> RecoveryContext<'a> {
    pub fn new(
        plan: &'a mut Plan,
        index: usize,
        error: ActionError,
        run: &'a mut RunState,
        env: &'a Collaborators,
        config: &'a ExecutionConfig,
        task: &'a str,
    ) -> Self {
        let (step_id, description) = plan
            .get(index)
            .map(|step| (step.id.clone(), step.description.clone()))
            .unwrap_or_default();
        Self {
            plan,
            index,
            step_id,
            description,
            error,
            run,
            env,
            config,
            task,
            fallback: None,
        }
    }

    /// Current action of the failing step
    pub fn action(&self) -> Option<Action> {
        self.plan.get(self.index).and_then(|step| step.action.clone())
    }

    /// Run the failing step's action once more, through the trace.
    pub async fn retry_original(&mut self) -> Result<ActionReport, ActionError> {
        let action = self
            .action()
            .ok_or_else(|| ActionError::Internal("step has no action to retry".to_string()))?;
        self.run
            .execute(self.env.driver.as_ref(), &self.step_id, &action)
            .await
    }

    pub fn replace_action(&mut self, action: Action) {
        if let Some(step) = self.plan.get_mut(self.index) {
            step.action = Some(action);
        }
    }

    /// Whether `count` more steps may be inserted for this step
    pub fn can_insert(&self, count: usize) -> bool {
        !self.run.is_recovery_step(&self.step_id)
            && self.run.inserted_for(&self.step_id) + count <= self.config.max_inserted_steps
    }

    /// Insert `steps` before the failing step; the cursor then points at the first of them.
    pub fn insert_steps(&mut self, steps: Vec<Step>) -> Result<usize, PlanError> {
        let ids: Vec<StepId> = steps.iter().map(|step| step.id.clone()).collect();
        let inserted = self.plan.insert_before(self.index, steps)?;
        self.run.record_inserted(&self.step_id, &ids);
        Ok(inserted)
    }

    pub fn failure_analysis(&self, url: Option<String>, html: &str) -> FailureAnalysis {
        FailureAnalysis {
            task: self.task.to_string(),
            step_description: self.description.clone(),
            action: self.action(),
            error: self.error.to_string(),
            url,
            html_excerpt: truncate_chars(html, self.config.dom_excerpt_chars),
            attempts: self.run.attempts(&self.step_id),
        }
    }

    pub fn emit_retry(&self, tier: RecoveryTier) {
        self.env.reporter.emit(
            ProgressEvent::retry(self.index, self.plan.len(), self.description.clone())
                .with_details(json!({ "tier": tier.name(), "error": self.error.to_string() })),
        );
    }

    pub fn emit_analysis(&self, description: impl Into<String>, details: Value) {
        self.env.reporter.emit(
            ProgressEvent::analysis(self.index, self.plan.len(), description).with_details(details),
        );
    }
}

/// Ordered recovery tiers
pub struct RecoveryLadder {
    tiers: Vec<Box<dyn RecoveryStrategy>>,
}

impl RecoveryLadder {
    /// Quick dismiss, autonomous recovery, structured options, vision diagnosis
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                Box::new(QuickDismiss),
                Box::new(AutonomousRecovery),
                Box::new(StructuredRecovery),
                Box::new(VisionDiagnostic),
            ],
        }
    }

    pub fn with_tiers(tiers: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> Vec<RecoveryTier> {
        self.tiers.iter().map(|tier| tier.tier()).collect()
    }

    /// Handle one failure. Always answers; never runs more than the configured tiers.
    pub async fn recover(&self, ctx: &mut RecoveryContext<'_>) -> LadderOutcome {
        for strategy in &self.tiers {
            let tier = strategy.tier();
            if !strategy.is_available(ctx) {
                debug!(step = ctx.index, tier = %tier, "recovery tier unavailable");
                continue;
            }
            ctx.emit_retry(tier);
            if let Some(outcome) = strategy.attempt(ctx).await {
                info!(
                    step = ctx.index,
                    tier = %tier,
                    outcome = outcome.label(),
                    "Recovery tier answered"
                );
                return outcome;
            }
        }

        match ctx.fallback.take() {
            Some(option) => {
                info!(step = ctx.index, option = option.id(), "Applying deferred recovery option");
                structured::apply_option(ctx, option)
            }
            None => LadderOutcome::Advance {
                tier: RecoveryTier::StructuredOptions,
                reason: "no recovery tier produced a plan".to_string(),
            },
        }
    }
}

impl Default for RecoveryLadder {
    fn default() -> Self {
        Self::standard()
    }
}
