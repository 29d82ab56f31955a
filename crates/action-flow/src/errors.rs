//! Flow execution error types

use thiserror::Error;

/// Flow execution errors
#[derive(Debug, Error)]
pub enum FlowError {
    /// Browser or session could not start; the only error that aborts a run
    #[error("Fatal initialization error: {0}")]
    FatalInitialization(String),

    /// Every recovery tier and the persistent-failure pass failed for a step
    #[error("Recovery exhausted for step {step}: {reason}")]
    RecoveryExhausted { step: usize, reason: String },

    /// Action driver error
    #[error("Action error: {0}")]
    ActionError(String),

    /// Plan mutation rejected
    #[error("Plan error: {0}")]
    PlanError(String),

    /// Collaborator error
    #[error("Collaborator error: {0}")]
    AgentError(String),

    /// Replay artifact could not be written
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        FlowError::ActionError(err.to_string())
    }
}

impl From<surefoot_core_types::PlanError> for FlowError {
    fn from(err: surefoot_core_types::PlanError) -> Self {
        FlowError::PlanError(err.to_string())
    }
}

impl From<agent_core::AgentError> for FlowError {
    fn from(err: agent_core::AgentError) -> Self {
        FlowError::AgentError(err.to_string())
    }
}

impl FlowError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FlowError::FatalInitialization(_))
    }
}
