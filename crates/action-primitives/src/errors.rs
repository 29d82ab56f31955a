//! Error types for browser driver operations

use thiserror::Error;

/// Error types for driver operations
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// No selector candidate matched a visible element
    #[error("Resolution failure: {0}")]
    ResolutionFailure(String),

    /// Element is not clickable (obscured, disabled, or not interactable)
    #[error("Element not clickable: {0}")]
    NotClickable(String),

    /// Navigation timed out waiting for page load
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Scroll or tab target is invalid
    #[error("Target invalid: {0}")]
    TargetInvalid(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Browser or session could not start
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Driver does not implement the action
    #[error("Unsupported action: {0}")]
    Unsupported(String),

    /// Remediation script refused by the sandbox policy
    #[error("Script rejected: {0}")]
    ScriptRejected(String),

    /// Script threw or could not be evaluated
    #[error("Script failed: {0}")]
    ScriptFailed(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::ResolutionFailure(_)
                | ActionError::NotClickable(_)
                | ActionError::NavTimeout(_)
                | ActionError::WaitTimeout(_)
                | ActionError::CdpIo(_)
                | ActionError::ScriptFailed(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Initialization(_) | ActionError::Internal(_) => 3,
            ActionError::NavTimeout(_) | ActionError::CdpIo(_) | ActionError::Unsupported(_) => 2,
            ActionError::WaitTimeout(_)
            | ActionError::ResolutionFailure(_)
            | ActionError::ScriptRejected(_) => 1,
            _ => 0,
        }
    }

    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, ActionError::ResolutionFailure(_))
    }
}
