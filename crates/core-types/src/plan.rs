use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::action::Action;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("step index {index} out of bounds (plan has {len} steps)")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("cannot insert at {at}: insertions must land at or before the cursor {cursor}")]
    InsertAfterCursor { at: usize, cursor: usize },
}

/// Stable step identity; survives index shifts caused by insertions.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One intended browser action plus completion and retry state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: StepId,
    pub description: String,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub retry_count: u32,
}

impl Step {
    pub fn new(description: impl Into<String>, action: Action) -> Self {
        Self {
            id: StepId::new(),
            description: description.into(),
            action: Some(action),
            completed: false,
            retry_count: 0,
        }
    }

    /// A step with no action; executes as a no-op
    pub fn note(description: impl Into<String>) -> Self {
        Self {
            id: StepId::new(),
            description: description.into(),
            action: None,
            completed: false,
            retry_count: 0,
        }
    }

    /// Stabilization wait used by recovery strategies
    pub fn wait(duration_ms: u64) -> Self {
        Self::new(
            format!("Wait {duration_ms}ms for the page to settle"),
            Action::wait(duration_ms),
        )
    }
}

/// Ordered, index-addressable, insertable sequence of steps.
///
/// The plan never shrinks during a run. Steps are inserted only at or before the current cursor
/// so completed steps keep their relative order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub description: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_steps(description: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            description: description.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    pub fn step(&self, index: usize) -> Result<&Step, PlanError> {
        let len = self.steps.len();
        self.steps
            .get(index)
            .ok_or(PlanError::IndexOutOfBounds { index, len })
    }

    pub fn step_mut(&mut self, index: usize) -> Result<&mut Step, PlanError> {
        let len = self.steps.len();
        self.steps
            .get_mut(index)
            .ok_or(PlanError::IndexOutOfBounds { index, len })
    }

    pub fn position(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|step| &step.id == id)
    }

    /// Splice `steps` in at `cursor` so they run before the step currently at `cursor`.
    ///
    /// Returns the number of inserted steps. The step that was at `cursor` moves to
    /// `cursor + inserted`.
    pub fn insert_before(&mut self, cursor: usize, steps: Vec<Step>) -> Result<usize, PlanError> {
        self.insert_at(cursor, cursor, steps)
    }

    /// Insert at `at`, which must not be past `cursor`.
    pub fn insert_at(
        &mut self,
        at: usize,
        cursor: usize,
        steps: Vec<Step>,
    ) -> Result<usize, PlanError> {
        if at > cursor {
            return Err(PlanError::InsertAfterCursor { at, cursor });
        }
        if cursor > self.steps.len() {
            return Err(PlanError::IndexOutOfBounds {
                index: cursor,
                len: self.steps.len(),
            });
        }
        let inserted = steps.len();
        self.steps.splice(at..at, steps);
        Ok(inserted)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|step| step.completed).count()
    }

    pub fn pending(&self) -> impl Iterator<Item = (usize, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ElementTarget;

    fn sample_plan() -> Plan {
        Plan::with_steps(
            "search",
            vec![
                Step::new("open", Action::Navigate { url: "https://example.com".into() }),
                Step::new("click", Action::click(ElementTarget::new("#go"))),
                Step::new("shot", Action::Screenshot { name: None, full_page: false }),
            ],
        )
    }

    #[test]
    fn test_insert_before_shifts_current_step() {
        let mut plan = sample_plan();
        let click_id = plan.steps[1].id.clone();

        let inserted = plan.insert_before(1, vec![Step::wait(2000)]).unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.steps[1].action, Some(Action::wait(2000)));
        assert_eq!(plan.position(&click_id), Some(2));
    }

    #[test]
    fn test_insert_after_cursor_rejected() {
        let mut plan = sample_plan();
        let err = plan.insert_at(2, 1, vec![Step::wait(10)]).unwrap_err();
        assert_eq!(err, PlanError::InsertAfterCursor { at: 2, cursor: 1 });
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_insert_at_end_allowed() {
        let mut plan = sample_plan();
        plan.insert_before(3, vec![Step::note("tail")]).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(plan.insert_before(9, vec![]).is_err());
    }

    #[test]
    fn test_step_defaults_from_json() {
        let step: Step = serde_json::from_value(serde_json::json!({
            "description": "think"
        }))
        .unwrap();
        assert!(step.action.is_none());
        assert_eq!(step.retry_count, 0);
        assert!(!step.id.0.is_empty());
    }
}
