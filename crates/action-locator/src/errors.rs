//! Error types for locator system

use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No explicit or heuristic candidate matched a visible element
    #[error("Resolution failure: {0}")]
    ResolutionFailure(String),

    /// Locator string could not be parsed
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// Probe could not query the page
    #[error("Probe error: {0}")]
    Probe(String),

    /// Timeout during resolution
    #[error("Resolution timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocatorError::ResolutionFailure(_) | LocatorError::Timeout(_) | LocatorError::Probe(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Probe(_) | LocatorError::Timeout(_) => 2,
            LocatorError::ResolutionFailure(_) => 1,
            LocatorError::InvalidLocator(_) => 0,
        }
    }
}
