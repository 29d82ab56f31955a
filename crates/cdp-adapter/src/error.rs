//! Adapter error metadata and conversions into the driver taxonomy

use action_locator::LocatorError;
use action_primitives::ActionError;
use chromiumoxide::error::CdpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterErrorKind {
    #[error("browser launch failed")]
    Launch,
    #[error("browser not launched")]
    NotLaunched,
    #[error("navigation timed out")]
    NavTimeout,
    #[error("invalid url")]
    InvalidUrl,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("target element not found")]
    TargetNotFound,
    #[error("element not interactable")]
    NotInteractable,
    #[error("option not found")]
    OptionNotFound,
    #[error("tab not found")]
    TabNotFound,
    #[error("script evaluation failed")]
    Script,
    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    pub fn cdp(context: &str, err: impl fmt::Display) -> Self {
        Self::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("{context}: {err}"))
            .retriable(true)
    }

    fn hint_text(&self) -> String {
        self.hint.clone().unwrap_or_else(|| self.kind.to_string())
    }
}

impl From<CdpError> for AdapterError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint("request timed out")
                .retriable(true),
            CdpError::NotFound => AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint("node not found")
                .retriable(true),
            CdpError::JavascriptException(details) => AdapterError::new(AdapterErrorKind::Script)
                .with_hint(details.text.clone())
                .retriable(true),
            other => AdapterError::cdp("protocol error", other),
        }
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let hint = err.hint_text();
        match err.kind {
            AdapterErrorKind::Launch | AdapterErrorKind::NotLaunched => {
                ActionError::Initialization(hint)
            }
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(hint),
            AdapterErrorKind::InvalidUrl | AdapterErrorKind::TabNotFound => {
                ActionError::TargetInvalid(hint)
            }
            AdapterErrorKind::CdpIo => ActionError::CdpIo(hint),
            AdapterErrorKind::TargetNotFound => ActionError::ResolutionFailure(hint),
            AdapterErrorKind::NotInteractable => ActionError::NotClickable(hint),
            AdapterErrorKind::OptionNotFound => ActionError::OptionNotFound(hint),
            AdapterErrorKind::Script => ActionError::ScriptFailed(hint),
            AdapterErrorKind::Internal => ActionError::Internal(hint),
        }
    }
}

impl From<AdapterError> for LocatorError {
    fn from(err: AdapterError) -> Self {
        let hint = err.hint_text();
        match err.kind {
            AdapterErrorKind::NavTimeout => LocatorError::Timeout(hint),
            AdapterErrorKind::Internal => LocatorError::Internal(hint),
            _ => LocatorError::Probe(hint),
        }
    }
}

/// Locator failures surface to the engine as driver errors
pub(crate) fn locator_to_action(err: LocatorError) -> ActionError {
    match err {
        LocatorError::ResolutionFailure(msg) => ActionError::ResolutionFailure(msg),
        LocatorError::InvalidLocator(msg) => ActionError::TargetInvalid(msg),
        LocatorError::Probe(msg) => ActionError::CdpIo(msg),
        LocatorError::Timeout(msg) => ActionError::WaitTimeout(msg),
        LocatorError::Internal(msg) => ActionError::Internal(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_hint() {
        let err = AdapterError::new(AdapterErrorKind::TabNotFound).with_hint("index 3 of 1");
        assert_eq!(err.to_string(), "tab not found: index 3 of 1");
        assert!(!err.retriable);
    }

    #[test]
    fn test_action_error_mapping() {
        let err: ActionError = AdapterError::new(AdapterErrorKind::NotLaunched).into();
        assert!(matches!(err, ActionError::Initialization(_)));

        let err: ActionError = AdapterError::cdp("goto", "socket closed").into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "CDP I/O error: goto: socket closed");

        let err: ActionError = AdapterError::new(AdapterErrorKind::OptionNotFound)
            .with_hint("Blue")
            .into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_locator_error_mapping() {
        let err: LocatorError = AdapterError::cdp("count", "closed").into();
        assert!(matches!(err, LocatorError::Probe(_)));
        let action = locator_to_action(LocatorError::ResolutionFailure("#q".into()));
        assert!(action.is_resolution_failure());
    }
}
