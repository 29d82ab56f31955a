//! `BrowserDriver` implementation over chromiumoxide

use action_locator::{Resolution, ResolverConfig, SelectorResolver};
use action_primitives::{
    slugify, ActionError, ActionReport, BrowserDriver, PostSignals, ScreenshotOptions,
    SelfHealInfo,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surefoot_core_types::{Action, ElementTarget};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::CdpConfig;
use crate::error::{locator_to_action, AdapterError, AdapterErrorKind};
use crate::probe::{evaluate_on, SessionProbe};
use crate::script::{
    clear_script, mark_script, marked_selector, scroll_script, select_script,
    HISTORY_BACK_SCRIPT, HISTORY_FORWARD_SCRIPT,
};
use crate::session::BrowserSession;

#[derive(Debug, Deserialize)]
struct SelectOutcome {
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Chromium-backed driver.
///
/// Targets are resolved through the shared [`SelectorResolver`], then the winning element is
/// tagged with a one-off token attribute so a CDP element handle can be fetched for it.
pub struct ChromiumDriver {
    session: Arc<BrowserSession>,
    resolver: Arc<SelectorResolver>,
}

impl ChromiumDriver {
    pub fn new(config: CdpConfig) -> Self {
        Self::with_resolver_config(config, ResolverConfig::default())
    }

    pub fn with_resolver_config(config: CdpConfig, resolver_config: ResolverConfig) -> Self {
        let session = Arc::new(BrowserSession::new(config));
        let probe = Arc::new(SessionProbe::new(session.clone()));
        let resolver = Arc::new(SelectorResolver::with_config(probe, resolver_config));
        Self { session, resolver }
    }

    /// Resolver bound to this driver's session; hand it to the controller for recovery
    pub fn resolver(&self) -> Arc<SelectorResolver> {
        self.resolver.clone()
    }

    pub fn session(&self) -> Arc<BrowserSession> {
        self.session.clone()
    }

    pub async fn close(&self) -> Result<(), ActionError> {
        self.session.close().await.map_err(ActionError::from)
    }

    fn config(&self) -> &CdpConfig {
        self.session.config()
    }

    async fn page(&self) -> Result<Page, ActionError> {
        self.session.active_page().await.map_err(ActionError::from)
    }

    async fn navigate(&self, page: &Page, raw: &str) -> Result<(), ActionError> {
        let url = normalize_url(raw)?;
        let limit = Duration::from_millis(self.config().navigation_timeout_ms);
        match timeout(limit, page.goto(url.as_str())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(AdapterError::from(err).into()),
            Err(_) => Err(ActionError::NavTimeout(format!(
                "{url} did not load within {}ms",
                limit.as_millis()
            ))),
        }
    }

    /// Resolve `target` and return a CDP handle to the winning element
    async fn element(
        &self,
        page: &Page,
        target: &ElementTarget,
    ) -> Result<(Element, Resolution), ActionError> {
        let resolution = self
            .resolver
            .resolve_target(target)
            .await
            .map_err(locator_to_action)?;
        let token = Uuid::new_v4().simple().to_string();
        let marked = evaluate_on(page, mark_script(&resolution.locator, &token))
            .await
            .map_err(ActionError::from)?;
        if marked.as_bool() != Some(true) {
            return Err(ActionError::ResolutionFailure(format!(
                "{} vanished after resolution",
                resolution.candidate
            )));
        }
        let element = page
            .find_element(marked_selector(&token))
            .await
            .map_err(|err| ActionError::ResolutionFailure(format!("{}: {err}", resolution.candidate)))?;
        Ok((element, resolution))
    }

    async fn press(&self, page: &Page, key: &str) -> Result<(), ActionError> {
        if let Ok(focused) = page.find_element(":focus").await {
            if focused.press_key(key).await.is_ok() {
                return Ok(());
            }
        }
        dispatch_key_press(page, key).await.map_err(ActionError::from)
    }

    async fn history(&self, page: &Page, script: &str) -> Result<(), ActionError> {
        evaluate_on(page, script.to_string())
            .await
            .map_err(ActionError::from)?;
        let limit = Duration::from_millis(self.config().navigation_timeout_ms);
        if let Err(err) = timeout(limit, page.wait_for_navigation()).await {
            debug!(error = %err, "history navigation did not settle");
        }
        Ok(())
    }

    async fn capture(
        &self,
        page: &Page,
        name: &str,
        full_page: bool,
    ) -> Result<PathBuf, ActionError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        let bytes = page
            .screenshot(params)
            .await
            .map_err(|err| AdapterError::cdp("screenshot", err))?;

        let dir = &self.config().screenshot_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| ActionError::Internal(format!("create {}: {err}", dir.display())))?;
        let path = dir.join(format!(
            "{}-{}.png",
            slugify(name),
            Utc::now().format("%Y%m%d-%H%M%S%3f")
        ));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| ActionError::Internal(format!("write {}: {err}", path.display())))?;
        debug!(path = %path.display(), "screenshot written");
        Ok(path)
    }

    async fn post_signals(&self) -> PostSignals {
        let Ok(page) = self.session.active_page().await else {
            return PostSignals::default();
        };
        PostSignals {
            url_after: page.url().await.ok().flatten(),
            title_after: page.get_title().await.ok().flatten(),
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn ensure_ready(&self) -> Result<(), ActionError> {
        self.session.launch().await.map_err(ActionError::from)
    }

    async fn execute_action(&self, action: &Action) -> Result<ActionReport, ActionError> {
        let started_at = Utc::now();
        let page = self.page().await?;
        let mut resolution: Option<(String, Resolution)> = None;
        let mut screenshot = None;

        match action {
            Action::Navigate { url } => self.navigate(&page, url).await?,
            Action::Click { target } => {
                let (element, res) = self.element(&page, target).await?;
                element
                    .click()
                    .await
                    .map_err(|err| ActionError::NotClickable(format!("{}: {err}", res.candidate)))?;
                resolution = Some((primary_anchor(target), res));
            }
            Action::Type {
                target,
                text,
                clear,
            } => {
                let (element, res) = self.element(&page, target).await?;
                element
                    .click()
                    .await
                    .map_err(|err| ActionError::NotClickable(format!("{}: {err}", res.candidate)))?;
                if *clear {
                    let token = marked_token(&element).await;
                    if let Some(token) = token {
                        evaluate_on(&page, clear_script(&token))
                            .await
                            .map_err(ActionError::from)?;
                    }
                }
                element
                    .type_str(text)
                    .await
                    .map_err(|err| AdapterError::cdp("type", err))?;
                resolution = Some((primary_anchor(target), res));
            }
            Action::Press { key } => self.press(&page, key).await?,
            Action::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
            }
            Action::Scroll { direction, amount } => {
                evaluate_on(&page, scroll_script(*direction, *amount))
                    .await
                    .map_err(ActionError::from)?;
            }
            Action::Select { target, value } => {
                let (element, res) = self.element(&page, target).await?;
                let token = marked_token(&element).await.ok_or_else(|| {
                    ActionError::ResolutionFailure(format!("{} lost its mark", res.candidate))
                })?;
                let outcome = evaluate_on(&page, select_script(&token, value))
                    .await
                    .map_err(ActionError::from)?;
                let outcome: SelectOutcome = serde_json::from_value(outcome)
                    .map_err(|err| ActionError::ScriptFailed(err.to_string()))?;
                if !outcome.ok {
                    return Err(match outcome.reason.as_deref() {
                        Some("not_select") => ActionError::TargetInvalid(format!(
                            "{} is not a <select>",
                            res.candidate
                        )),
                        _ => AdapterError::new(AdapterErrorKind::OptionNotFound)
                            .with_hint(value.clone())
                            .into(),
                    });
                }
                resolution = Some((primary_anchor(target), res));
            }
            Action::Screenshot { name, full_page } => {
                let name = name.clone().unwrap_or_else(|| "page".to_string());
                screenshot = Some(self.capture(&page, &name, *full_page).await?);
            }
            Action::GoBack => self.history(&page, HISTORY_BACK_SCRIPT).await?,
            Action::GoForward => self.history(&page, HISTORY_FORWARD_SCRIPT).await?,
            Action::Reload => {
                page.reload()
                    .await
                    .map_err(|err| ActionError::from(AdapterError::from(err)))?;
            }
            Action::NewTab { url } => {
                let url = url.as_deref().map(normalize_url).transpose()?;
                self.session
                    .open_tab(url.as_ref().map(Url::as_str))
                    .await
                    .map_err(ActionError::from)?;
            }
            Action::SwitchTab { index } => self
                .session
                .switch_tab(*index)
                .await
                .map_err(ActionError::from)?,
            Action::CloseTab { index } => self
                .session
                .close_tab(*index)
                .await
                .map_err(ActionError::from)?,
        }

        let mut report = ActionReport::success(started_at).with_signals(self.post_signals().await);
        if let Some(path) = screenshot {
            report = report.with_screenshot(path);
        }
        if let Some((original, res)) = resolution.filter(|(_, res)| res.is_fallback()) {
            info!(
                original = original.as_str(),
                healed = res.candidate.as_str(),
                "action used a fallback locator"
            );
            report = report.with_heal(SelfHealInfo {
                original_anchor: original,
                healed_anchor: res.candidate.clone(),
                strategy: res.strategy_label(),
            });
        }
        debug!(action = action.kind(), latency_ms = report.latency_ms, "action executed");
        Ok(report)
    }

    async fn take_screenshot(
        &self,
        name: &str,
        options: ScreenshotOptions,
    ) -> Result<PathBuf, ActionError> {
        let page = self.page().await?;
        self.capture(&page, name, options.full_page).await
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        let page = self.page().await?;
        let url = page
            .url()
            .await
            .map_err(|err| ActionError::from(AdapterError::from(err)))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn page_html(&self) -> Result<String, ActionError> {
        let page = self.page().await?;
        page.content()
            .await
            .map_err(|err| ActionError::from(AdapterError::from(err)))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ActionError> {
        let page = self.page().await?;
        evaluate_on(&page, script.to_string())
            .await
            .map_err(ActionError::from)
    }
}

fn primary_anchor(target: &ElementTarget) -> String {
    target.selectors.primary().unwrap_or_default().to_string()
}

async fn marked_token(element: &Element) -> Option<String> {
    element
        .attribute(crate::script::MARK_ATTRIBUTE)
        .await
        .ok()
        .flatten()
}

/// Accept absolute URLs and `about:` pages; bare hosts get `https://`
pub(crate) fn normalize_url(raw: &str) -> Result<Url, ActionError> {
    let trimmed = raw.trim();
    let invalid = |err: url::ParseError| {
        ActionError::from(
            AdapterError::new(AdapterErrorKind::InvalidUrl).with_hint(format!("{trimmed}: {err}")),
        )
    };
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if !trimmed.is_empty() => {
            Url::parse(&format!("https://{trimmed}")).map_err(invalid)
        }
        Err(err) => Err(invalid(err)),
    }
}

async fn dispatch_key_press(page: &Page, key: &str) -> Result<(), AdapterError> {
    for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
        let params = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key)
            .build()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("failed to build key event: {err}"))
            })?;
        if let Err(err) = page.execute(params).await {
            warn!(key, error = %err, "key event dispatch failed");
            return Err(AdapterError::cdp("dispatch key", err));
        }
    }
    Ok(())
}
