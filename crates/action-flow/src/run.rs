//! Mutable per-run bookkeeping: action trace, screenshots, errors and recovery budgets

use action_primitives::{ActionError, ActionReport, BrowserDriver};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;
use surefoot_core_types::{Action, StepId, StepResult};

use crate::types::RecoveryOptionKind;

/// State accumulated while a plan executes.
///
/// Recovery bookkeeping is keyed by [`StepId`] so it survives insertions that shift indices.
#[derive(Debug, Default)]
pub struct RunState {
    /// Every action handed to the driver, recorded before the call
    pub trace: Vec<Action>,
    pub screenshots: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub step_results: Vec<StepResult>,
    attempts: HashMap<StepId, u32>,
    started: HashMap<StepId, Instant>,
    applied: HashMap<StepId, HashMap<RecoveryOptionKind, u32>>,
    inserted: HashMap<StepId, usize>,
    recovery_steps: HashSet<StepId>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute an action on behalf of a step, counting it as an attempt.
    pub async fn execute(
        &mut self,
        driver: &dyn BrowserDriver,
        step: &StepId,
        action: &Action,
    ) -> Result<ActionReport, ActionError> {
        self.started.entry(step.clone()).or_insert_with(Instant::now);
        *self.attempts.entry(step.clone()).or_insert(0) += 1;
        self.execute_auxiliary(driver, action).await
    }

    /// Execute an action that belongs to no step, such as the dismiss key.
    pub async fn execute_auxiliary(
        &mut self,
        driver: &dyn BrowserDriver,
        action: &Action,
    ) -> Result<ActionReport, ActionError> {
        self.trace.push(action.clone());
        let report = driver.execute_action(action).await?;
        if let Some(path) = &report.screenshot {
            self.screenshots.push(path.clone());
        }
        Ok(report)
    }

    pub fn attempts(&self, step: &StepId) -> u32 {
        self.attempts.get(step).copied().unwrap_or(0)
    }

    /// Milliseconds since the first attempt of `step`, or zero if it never ran
    pub fn elapsed_ms(&self, step: &StepId) -> u64 {
        self.started
            .get(step)
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn applied_count(&self, step: &StepId, kind: RecoveryOptionKind) -> u32 {
        self.applied
            .get(step)
            .and_then(|kinds| kinds.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn record_applied(&mut self, step: &StepId, kind: RecoveryOptionKind) {
        *self
            .applied
            .entry(step.clone())
            .or_default()
            .entry(kind)
            .or_insert(0) += 1;
    }

    pub fn inserted_for(&self, step: &StepId) -> usize {
        self.inserted.get(step).copied().unwrap_or(0)
    }

    /// Register steps inserted on behalf of `origin`.
    pub fn record_inserted(&mut self, origin: &StepId, inserted: &[StepId]) {
        *self.inserted.entry(origin.clone()).or_insert(0) += inserted.len();
        self.recovery_steps.extend(inserted.iter().cloned());
    }

    /// Steps inserted by recovery may not insert further steps
    pub fn is_recovery_step(&self, step: &StepId) -> bool {
        self.recovery_steps.contains(step)
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn record_screenshot(&mut self, path: Option<PathBuf>) {
        if let Some(path) = path {
            if !self.screenshots.contains(&path) {
                self.screenshots.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_bookkeeping_is_per_step() {
        let mut run = RunState::new();
        let a = StepId::new();
        let b = StepId::new();

        run.record_applied(&a, RecoveryOptionKind::WaitThenRetry);
        run.record_applied(&a, RecoveryOptionKind::WaitThenRetry);

        assert_eq!(run.applied_count(&a, RecoveryOptionKind::WaitThenRetry), 2);
        assert_eq!(run.applied_count(&b, RecoveryOptionKind::WaitThenRetry), 0);
    }

    #[test]
    fn test_inserted_steps_are_tracked() {
        let mut run = RunState::new();
        let origin = StepId::new();
        let waits = vec![StepId::new(), StepId::new()];

        run.record_inserted(&origin, &waits);

        assert_eq!(run.inserted_for(&origin), 2);
        assert!(run.is_recovery_step(&waits[0]));
        assert!(!run.is_recovery_step(&origin));
    }

    #[test]
    fn test_screenshots_dedup() {
        let mut run = RunState::new();
        run.record_screenshot(Some(PathBuf::from("a.png")));
        run.record_screenshot(Some(PathBuf::from("a.png")));
        run.record_screenshot(None);
        assert_eq!(run.screenshots.len(), 1);
    }
}
