//! Core types for recovery

use action_primitives::ActionReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use surefoot_core_types::Action;

/// Recovery tiers, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    /// Send the dismiss key, settle, retry once
    QuickDismiss,

    /// Bounded loop of sandboxed remediation scripts
    AutonomousRecovery,

    /// Ranked recovery options
    StructuredOptions,

    /// Screenshot diagnosis by the vision collaborator
    VisionDiagnostic,
}

impl RecoveryTier {
    pub fn name(&self) -> &'static str {
        match self {
            RecoveryTier::QuickDismiss => "quick_dismiss",
            RecoveryTier::AutonomousRecovery => "autonomous_recovery",
            RecoveryTier::StructuredOptions => "structured_options",
            RecoveryTier::VisionDiagnostic => "vision_diagnostic",
        }
    }
}

impl fmt::Display for RecoveryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of structured recovery options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryOptionKind {
    AltSelectors,
    DismissOverlay,
    WaitThenRetry,
    PlannerAlternative,
    SkipStep,
}

impl RecoveryOptionKind {
    pub fn id(&self) -> &'static str {
        match self {
            RecoveryOptionKind::AltSelectors => "alt-selectors",
            RecoveryOptionKind::DismissOverlay => "dismiss-overlay",
            RecoveryOptionKind::WaitThenRetry => "wait-then-retry",
            RecoveryOptionKind::PlannerAlternative => "planner-alternative",
            RecoveryOptionKind::SkipStep => "skip-step",
        }
    }

    /// One-shot options are never offered twice for the same step
    pub fn is_one_shot(&self) -> bool {
        matches!(
            self,
            RecoveryOptionKind::AltSelectors
                | RecoveryOptionKind::DismissOverlay
                | RecoveryOptionKind::PlannerAlternative
        )
    }
}

impl fmt::Display for RecoveryOptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A candidate recovery with its confidence in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOption {
    pub kind: RecoveryOptionKind,
    pub description: String,
    pub confidence: f64,
    /// Replacement action, or steps to insert, depending on `kind`
    pub actions: Vec<Action>,
    pub reason: String,
}

impl RecoveryOption {
    pub fn new(
        kind: RecoveryOptionKind,
        description: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            actions: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }
}

/// Sort by descending confidence; ties keep their original order.
pub fn rank_options(options: &mut [RecoveryOption]) {
    options.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Answer of the recovery ladder for one failure
#[derive(Debug, Clone)]
pub enum LadderOutcome {
    /// The original action succeeded during recovery; mark the step completed
    Recovered {
        tier: RecoveryTier,
        report: Box<ActionReport>,
    },

    /// The step was rewritten in place; run it again
    RetryNow { tier: RecoveryTier, reason: String },

    /// Give up on this step and move on
    Advance { tier: RecoveryTier, reason: String },

    /// Steps were inserted before the failing step; resume at the cursor
    Mutated {
        tier: RecoveryTier,
        inserted: usize,
        reason: String,
    },
}

impl LadderOutcome {
    pub fn tier(&self) -> RecoveryTier {
        match self {
            LadderOutcome::Recovered { tier, .. }
            | LadderOutcome::RetryNow { tier, .. }
            | LadderOutcome::Advance { tier, .. }
            | LadderOutcome::Mutated { tier, .. } => *tier,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LadderOutcome::Recovered { .. } => "recovered",
            LadderOutcome::RetryNow { .. } => "retry_now",
            LadderOutcome::Advance { .. } => "advance",
            LadderOutcome::Mutated { .. } => "mutated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_options_is_stable() {
        let mut options = vec![
            RecoveryOption::new(RecoveryOptionKind::SkipStep, "skip", 0.1, "last resort"),
            RecoveryOption::new(RecoveryOptionKind::WaitThenRetry, "wait", 0.6, "timing"),
            RecoveryOption::new(RecoveryOptionKind::PlannerAlternative, "alt", 0.6, "planner"),
            RecoveryOption::new(RecoveryOptionKind::AltSelectors, "sel", 0.85, "visible"),
        ];
        rank_options(&mut options);
        let ids: Vec<_> = options.iter().map(RecoveryOption::id).collect();
        assert_eq!(
            ids,
            vec!["alt-selectors", "wait-then-retry", "planner-alternative", "skip-step"]
        );
    }

    #[test]
    fn test_confidence_clamped() {
        let option = RecoveryOption::new(RecoveryOptionKind::SkipStep, "skip", 3.0, "x");
        assert_eq!(option.confidence, 1.0);
    }

    #[test]
    fn test_one_shot_kinds() {
        assert!(RecoveryOptionKind::AltSelectors.is_one_shot());
        assert!(!RecoveryOptionKind::WaitThenRetry.is_one_shot());
        assert!(!RecoveryOptionKind::SkipStep.is_one_shot());
    }
}
