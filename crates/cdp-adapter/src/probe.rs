//! `ElementProbe` over the active tab

use action_locator::{ElementProbe, Locator, LocatorError};
use async_trait::async_trait;
use chromiumoxide::Page;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AdapterError;
use crate::script::{count_script, visible_script};
use crate::session::BrowserSession;

/// Evaluate `script` and return its JSON value (`Null` for `undefined`)
pub(crate) async fn evaluate_on(page: &Page, script: String) -> Result<Value, AdapterError> {
    let result = page
        .evaluate_expression(script)
        .await
        .map_err(AdapterError::from)?;
    Ok(result.value().cloned().unwrap_or(Value::Null))
}

/// Answers resolver queries by evaluating locator scripts in the session's active tab
pub struct SessionProbe {
    session: Arc<BrowserSession>,
}

impl SessionProbe {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ElementProbe for SessionProbe {
    async fn count(&self, locator: &Locator) -> Result<usize, LocatorError> {
        let page = self.session.active_page().await?;
        let value = evaluate_on(&page, count_script(locator)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, LocatorError> {
        let page = self.session.active_page().await?;
        let value = evaluate_on(&page, visible_script(locator)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
