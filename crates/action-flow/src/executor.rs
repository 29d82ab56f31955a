//! Step execution controller

use action_primitives::ActionError;
use agent_core::FailureAnalysis;
use chrono::Utc;
use serde_json::json;
use std::time::Instant;
use surefoot_core_types::{Action, ExecutionResult, Plan, SelectorSet, StepResult};
use surefoot_event_bus::ProgressEvent;
use tracing::{debug, info, warn};

use crate::artifact::{write_sequence, ActionSequence};
use crate::config::ExecutionConfig;
use crate::env::Collaborators;
use crate::errors::FlowError;
use crate::run::RunState;
use crate::strategies::{RecoveryContext, RecoveryLadder};
use crate::types::LadderOutcome;

/// Controller states. The cursor only moves forward or stays put; recovery may insert steps at
/// the cursor but never after it.
#[derive(Debug)]
enum ControllerState {
    Running { index: usize, final_attempt: bool },
    Escalating { index: usize, error: ActionError },
    PersistentFailure { index: usize, error: ActionError },
    Terminal,
}

impl ControllerState {
    fn running(index: usize) -> Self {
        ControllerState::Running {
            index,
            final_attempt: false,
        }
    }
}

#[derive(Debug, Default)]
struct Checkpoints {
    step_fired: bool,
    half_fired: bool,
}

/// Drives a plan to completion.
///
/// Each step runs once; on failure the retry count grows and the recovery ladder decides what
/// happens next. After `max_retries` failures the step gets one persistent-failure pass and a
/// final attempt, then it is abandoned and the run moves on. Only a browser that cannot start
/// makes [`execute`](Self::execute) return an error.
pub struct StepExecutionController {
    plan: Plan,
    task: String,
    env: Collaborators,
    config: ExecutionConfig,
    ladder: RecoveryLadder,
}

impl StepExecutionController {
    pub fn new(plan: Plan, env: Collaborators, config: ExecutionConfig) -> Self {
        Self {
            task: plan.description.clone(),
            plan,
            env,
            config,
            ladder: RecoveryLadder::standard(),
        }
    }

    /// Task text handed to collaborators; defaults to the plan description.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn with_ladder(mut self, ladder: RecoveryLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run the plan, navigating to `start_url` first unless the plan opens with a navigation.
    pub async fn execute(&mut self, start_url: Option<&str>) -> Result<ExecutionResult, FlowError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!("Executing plan: {} ({} steps)", self.task, self.plan.len());

        self.env
            .driver
            .ensure_ready()
            .await
            .map_err(|e| FlowError::FatalInitialization(e.to_string()))?;

        let mut run = RunState::new();
        let mut checkpoints = Checkpoints::default();
        if let Some(url) = start_url {
            self.open_start_url(&mut run, url).await;
        }

        let mut state = ControllerState::running(0);
        loop {
            state = match state {
                ControllerState::Running {
                    index,
                    final_attempt,
                } => {
                    self.run_step(&mut run, &mut checkpoints, index, final_attempt)
                        .await
                }
                ControllerState::Escalating { index, error } => {
                    self.escalate(&mut run, &mut checkpoints, index, error).await
                }
                ControllerState::PersistentFailure { index, error } => {
                    self.persistent_failure(&mut run, index, error).await
                }
                ControllerState::Terminal => break,
            };
        }

        let generated_artifact_path = match self.config.artifact_dir.clone() {
            Some(dir) => {
                let sequence = ActionSequence::new(self.task.clone(), start_url, run.trace.clone());
                match write_sequence(&dir, &sequence).await {
                    Ok(path) => {
                        info!("Replay artifact written to {}", path.display());
                        Some(path)
                    }
                    Err(err) => {
                        warn!(error = %err, "replay artifact not written");
                        run.record_error(err.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        let elapsed_ms = clock.elapsed().as_millis() as u64;
        info!(
            "Plan finished in {}ms: {}/{} steps completed, {} errors",
            elapsed_ms,
            self.plan.completed_count(),
            self.plan.len(),
            run.errors.len()
        );

        Ok(ExecutionResult {
            success: true,
            final_plan: self.plan.clone(),
            elapsed_ms,
            started_at,
            finished_at: Utc::now(),
            screenshots: run.screenshots,
            errors: run.errors,
            step_results: run.step_results,
            action_trace: run.trace,
            generated_artifact_path,
        })
    }

    async fn open_start_url(&self, run: &mut RunState, url: &str) {
        let opens_with_navigation = matches!(
            self.plan.get(0).and_then(|step| step.action.as_ref()),
            Some(Action::Navigate { .. })
        );
        if opens_with_navigation {
            return;
        }
        let navigate = Action::Navigate {
            url: url.to_string(),
        };
        if let Err(err) = run.execute_auxiliary(self.env.driver.as_ref(), &navigate).await {
            warn!(url, error = %err, "initial navigation failed");
            run.record_error(format!("Initial navigation to {url} failed: {err}"));
        }
    }

    async fn run_step(
        &mut self,
        run: &mut RunState,
        checkpoints: &mut Checkpoints,
        index: usize,
        final_attempt: bool,
    ) -> ControllerState {
        let Some(step) = self.plan.get(index).cloned() else {
            return ControllerState::Terminal;
        };
        if step.completed {
            debug!(step = index, "already completed");
            return ControllerState::running(index + 1);
        }
        self.env.reporter.emit(ProgressEvent::step_start(
            index,
            self.plan.len(),
            step.description.clone(),
        ));

        let Some(action) = step.action.clone() else {
            debug!(step = index, "no action, completing as no-op");
            self.complete(run, checkpoints, index).await;
            return ControllerState::running(index + 1);
        };

        match run.execute(self.env.driver.as_ref(), &step.id, &action).await {
            Ok(report) => {
                if let Some(heal) = &report.self_heal {
                    info!(
                        step = index,
                        "Resolved {} via {} ({})", heal.original_anchor, heal.healed_anchor, heal.strategy
                    );
                }
                self.complete(run, checkpoints, index).await;
                ControllerState::running(index + 1)
            }
            Err(error) => {
                warn!(
                    "Step {} failed (attempt {}): {}",
                    index,
                    run.attempts(&step.id),
                    error
                );
                if final_attempt {
                    self.abandon(run, checkpoints, index, &error).await;
                    return ControllerState::running(index + 1);
                }

                let retry_count = match self.plan.get_mut(index) {
                    Some(step) => {
                        step.retry_count += 1;
                        step.retry_count
                    }
                    None => return ControllerState::Terminal,
                };
                self.env.reporter.emit(
                    ProgressEvent::step_failed(index, self.plan.len(), step.description.clone())
                        .with_details(json!({
                            "error": error.to_string(),
                            "retry_count": retry_count,
                            "max_retries": self.config.max_retries,
                        })),
                );

                if retry_count < self.config.max_retries {
                    ControllerState::Escalating { index, error }
                } else {
                    ControllerState::PersistentFailure { index, error }
                }
            }
        }
    }

    async fn escalate(
        &mut self,
        run: &mut RunState,
        checkpoints: &mut Checkpoints,
        index: usize,
        error: ActionError,
    ) -> ControllerState {
        let outcome = {
            let mut ctx = RecoveryContext::new(
                &mut self.plan,
                index,
                error,
                run,
                &self.env,
                &self.config,
                &self.task,
            );
            self.ladder.recover(&mut ctx).await
        };
        debug!(step = index, tier = %outcome.tier(), outcome = outcome.label(), "ladder outcome");

        match outcome {
            LadderOutcome::Recovered { .. } => {
                self.complete(run, checkpoints, index).await;
                ControllerState::running(index + 1)
            }
            LadderOutcome::RetryNow { .. } | LadderOutcome::Mutated { .. } => {
                ControllerState::running(index)
            }
            LadderOutcome::Advance { reason, .. } => {
                self.skip(run, checkpoints, index, &reason).await;
                ControllerState::running(index + 1)
            }
        }
    }

    async fn persistent_failure(
        &mut self,
        run: &mut RunState,
        index: usize,
        error: ActionError,
    ) -> ControllerState {
        let Some(step) = self.plan.get(index).cloned() else {
            return ControllerState::Terminal;
        };
        warn!(
            "Step {} still failing after {} retries, re-analyzing: {}",
            index, step.retry_count, error
        );
        self.env.reporter.emit(
            ProgressEvent::analysis(index, self.plan.len(), step.description.clone())
                .with_details(json!({ "persistent_failure": true, "error": error.to_string() })),
        );

        if let Some(planner) = self.env.planner.clone() {
            let capture = self
                .env
                .driver
                .capture_failure_context(&step.description)
                .await
                .unwrap_or_default();
            run.record_screenshot(capture.screenshot_path.clone());
            let analysis = FailureAnalysis {
                task: self.task.clone(),
                step_description: step.description.clone(),
                action: step.action.clone(),
                error: error.to_string(),
                url: capture.url,
                html_excerpt: capture.html,
                attempts: run.attempts(&step.id),
            };
            match planner.reanalyze_failure(&analysis).await {
                Ok(Some(selectors)) if !selectors.is_empty() => {
                    let target = self
                        .plan
                        .get_mut(index)
                        .and_then(|step| step.action.as_mut())
                        .and_then(Action::target_mut);
                    if let Some(target) = target {
                        info!(step = index, "Re-analysis replaced selectors with {:?}", selectors);
                        target.selectors = SelectorSet::Candidates(selectors);
                    }
                }
                Ok(_) => debug!(step = index, "re-analysis proposed no selectors"),
                Err(err) => warn!(step = index, error = %err, "re-analysis failed"),
            }
        }

        if let Some(step) = self.plan.get_mut(index) {
            step.retry_count = 0;
        }
        ControllerState::Running {
            index,
            final_attempt: true,
        }
    }

    async fn complete(&mut self, run: &mut RunState, checkpoints: &mut Checkpoints, index: usize) {
        let total = self.plan.len();
        let Some(step) = self.plan.get_mut(index) else {
            return;
        };
        step.completed = true;
        let step = step.clone();
        let attempts = run.attempts(&step.id);
        run.step_results.push(StepResult::success(
            index,
            step.clone(),
            run.elapsed_ms(&step.id),
            attempts,
        ));
        self.env.reporter.emit(
            ProgressEvent::step_complete(index, total, step.description.clone()).with_details(
                json!({ "attempts": attempts, "retry_count": step.retry_count }),
            ),
        );
        self.checkpoint(checkpoints, index).await;
    }

    async fn skip(
        &mut self,
        run: &mut RunState,
        checkpoints: &mut Checkpoints,
        index: usize,
        reason: &str,
    ) {
        let total = self.plan.len();
        let Some(step) = self.plan.get_mut(index) else {
            return;
        };
        step.completed = true;
        let step = step.clone();
        info!("Skipping step {} ({}): {}", index, step.description, reason);
        run.record_error(format!(
            "Step {} ({}) skipped: {}",
            index + 1,
            step.description,
            reason
        ));
        run.step_results.push(StepResult::skipped(
            index,
            step.clone(),
            reason,
            run.elapsed_ms(&step.id),
            run.attempts(&step.id),
        ));
        self.env.reporter.emit(
            ProgressEvent::step_failed(index, total, step.description)
                .with_details(json!({ "skipped": true, "reason": reason })),
        );
        self.checkpoint(checkpoints, index).await;
    }

    async fn abandon(
        &mut self,
        run: &mut RunState,
        checkpoints: &mut Checkpoints,
        index: usize,
        error: &ActionError,
    ) {
        let Some(step) = self.plan.get(index).cloned() else {
            return;
        };
        let attempts = run.attempts(&step.id);
        let message = format!(
            "Step {} ({}) abandoned after {} attempts: {}",
            index + 1,
            step.description,
            attempts,
            error
        );
        warn!("{}", message);
        run.record_error(message);
        run.step_results.push(StepResult::failure(
            index,
            step.clone(),
            error.to_string(),
            run.elapsed_ms(&step.id),
            attempts,
        ));
        self.env.reporter.emit(
            ProgressEvent::step_failed(index, self.plan.len(), step.description)
                .with_details(json!({ "abandoned": true, "error": error.to_string() })),
        );
        self.checkpoint(checkpoints, index).await;
    }

    /// Intent summary after the configured step and at half the plan; each fires once.
    async fn checkpoint(&mut self, checkpoints: &mut Checkpoints, index: usize) {
        let processed = index + 1;
        let total = self.plan.len();
        let step_due = !checkpoints.step_fired && processed >= self.config.summary_checkpoint_step;
        let half_due = !checkpoints.half_fired && total > 0 && processed * 2 >= total;
        if !step_due && !half_due {
            return;
        }
        checkpoints.step_fired |= step_due;
        checkpoints.half_fired |= half_due;

        let Some(planner) = self.env.planner.clone() else {
            return;
        };
        let completed: Vec<String> = self
            .plan
            .steps
            .iter()
            .filter(|step| step.completed)
            .map(|step| step.description.clone())
            .collect();
        match planner.summarize_intent(&self.task, &completed).await {
            Ok(summary) => {
                debug!(step = index, "intent summary: {}", summary);
                self.plan.description = summary.clone();
                self.env.reporter.emit(
                    ProgressEvent::analysis(index, total, "Intent summary").with_details(json!({
                        "checkpoint": if step_due { "step" } else { "half" },
                        "summary": summary,
                    })),
                );
            }
            Err(err) => debug!(step = index, error = %err, "intent summary unavailable"),
        }
    }
}
