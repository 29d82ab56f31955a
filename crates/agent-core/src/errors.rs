use thiserror::Error;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error, Clone)]
pub enum AgentError {
    /// Raised when a request is malformed or missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),

    /// Raised when a collaborator is not configured or cannot be reached.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Raised when the remote provider rejects or fails a call.
    #[error("provider error: {0}")]
    Provider(String),

    /// Raised when a collaborator response cannot be interpreted.
    #[error("failed to parse collaborator response: {0}")]
    Parse(String),
}

impl AgentError {
    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Parse failures degrade to a stabilization wait instead of aborting recovery.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
