//! Browser driver contract

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use surefoot_core_types::Action;
use tracing::debug;

use crate::{
    errors::ActionError,
    overlay::{OverlayReport, OVERLAY_PROBE_SCRIPT},
    types::{slugify, ActionReport, FailureContext, ScreenshotOptions},
};

/// Narrow contract between the execution engine and a browser.
///
/// Implementations own a single "current page". The engine never issues two calls
/// concurrently, so implementations need no internal ordering beyond their own session state.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Make sure a browser session exists. Failure aborts the run.
    async fn ensure_ready(&self) -> Result<(), ActionError>;

    /// Execute one action against the current page
    async fn execute_action(&self, action: &Action) -> Result<ActionReport, ActionError>;

    /// Capture a screenshot and return the written path
    async fn take_screenshot(
        &self,
        name: &str,
        options: ScreenshotOptions,
    ) -> Result<PathBuf, ActionError>;

    async fn current_url(&self) -> Result<String, ActionError>;

    async fn page_html(&self) -> Result<String, ActionError>;

    /// Evaluate a JavaScript expression in the current page
    async fn evaluate(&self, script: &str) -> Result<Value, ActionError>;

    /// Snapshot HTML, URL and a full-page screenshot for diagnosis.
    ///
    /// Partial captures are fine; individual capture errors are logged and left empty.
    async fn capture_failure_context(
        &self,
        description: &str,
    ) -> Result<FailureContext, ActionError> {
        let html = match self.page_html().await {
            Ok(html) => html,
            Err(err) => {
                debug!(error = %err, "failure context: html unavailable");
                String::new()
            }
        };
        let name = format!("failure-{}", slugify(description));
        let screenshot_path = match self.take_screenshot(&name, ScreenshotOptions::full_page()).await
        {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(error = %err, "failure context: screenshot unavailable");
                None
            }
        };
        let url = self.current_url().await.ok();
        Ok(FailureContext {
            html,
            screenshot_path,
            url,
        })
    }

    /// Detect a modal, cookie banner or other overlay covering the page
    async fn detect_overlay(&self) -> Result<OverlayReport, ActionError> {
        let value = self.evaluate(OVERLAY_PROBE_SCRIPT).await?;
        Ok(OverlayReport::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    /// Page whose HTML cannot be read but which screenshots fine
    struct HalfBrokenDriver;

    #[async_trait]
    impl BrowserDriver for HalfBrokenDriver {
        async fn ensure_ready(&self) -> Result<(), ActionError> {
            Ok(())
        }

        async fn execute_action(&self, _action: &Action) -> Result<ActionReport, ActionError> {
            Ok(ActionReport::success(Utc::now()))
        }

        async fn take_screenshot(
            &self,
            name: &str,
            options: ScreenshotOptions,
        ) -> Result<PathBuf, ActionError> {
            assert!(options.full_page);
            Ok(PathBuf::from(format!("{name}.png")))
        }

        async fn current_url(&self) -> Result<String, ActionError> {
            Ok("https://example.com/cart".into())
        }

        async fn page_html(&self) -> Result<String, ActionError> {
            Err(ActionError::CdpIo("target closed".into()))
        }

        async fn evaluate(&self, _script: &str) -> Result<Value, ActionError> {
            Ok(json!({ "present": true, "kind": "dialog", "coverage": 0.6 }))
        }
    }

    #[test]
    fn test_failure_context_tolerates_partial_capture() {
        let context =
            tokio_test::block_on(HalfBrokenDriver.capture_failure_context("Click 'Checkout'"))
                .unwrap();
        assert!(context.html.is_empty());
        assert_eq!(
            context.screenshot_path,
            Some(PathBuf::from("failure-click-checkout.png"))
        );
        assert_eq!(context.url.as_deref(), Some("https://example.com/cart"));
    }

    #[test]
    fn test_detect_overlay_parses_probe_result() {
        let report = tokio_test::block_on(HalfBrokenDriver.detect_overlay()).unwrap();
        assert!(report.present);
        assert_eq!(report.kind.as_deref(), Some("dialog"));
        assert!(report.close_selector.is_none());
    }
}
