//! Explicit browser session handle

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};

struct SessionState {
    browser: Browser,
    handler: JoinHandle<()>,
    tabs: Vec<Page>,
    active: usize,
}

/// Owns the Chromium process, its CDP handler task and the open tabs.
///
/// Created lazily by [`launch`](Self::launch) and torn down by [`close`](Self::close). One tab is
/// "active" at a time; every page query goes to it.
pub struct BrowserSession {
    config: CdpConfig,
    state: Mutex<Option<SessionState>>,
}

impl BrowserSession {
    pub fn new(config: CdpConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }

    pub async fn is_launched(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Launch Chromium and open a blank tab; no-op when already launched.
    pub async fn launch(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(());
        }

        let mut builder = BrowserConfig::builder()
            .window_size(self.config.window_width, self.config.window_height)
            .launch_timeout(Duration::from_millis(self.config.launch_timeout_ms))
            .request_timeout(Duration::from_millis(self.config.navigation_timeout_ms));
        if self.config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let browser_config = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch)
                .with_hint(format!("failed to build browser config: {err}"))
        })?;

        info!(
            executable = ?self.config.executable,
            headless = self.config.headless,
            "launching chromium"
        );
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Launch).with_hint(format!("failed to launch: {err}"))
        })?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| AdapterError::cdp("open initial tab", err))?;

        *state = Some(SessionState {
            browser,
            handler,
            tabs: vec![page],
            active: 0,
        });
        Ok(())
    }

    /// Close every tab and the browser; no-op when not launched.
    pub async fn close(&self) -> Result<(), AdapterError> {
        let Some(mut state) = self.state.lock().await.take() else {
            return Ok(());
        };
        for page in state.tabs.drain(..) {
            if let Err(err) = page.close().await {
                debug!(error = %err, "closing tab failed");
            }
        }
        let result = state.browser.close().await;
        if let Err(err) = state.browser.wait().await {
            debug!(error = %err, "waiting for browser exit failed");
        }
        state.handler.abort();
        info!("browser closed");
        result
            .map(|_| ())
            .map_err(|err| AdapterError::cdp("close browser", err))
    }

    /// Handle to the active tab
    pub async fn active_page(&self) -> Result<Page, AdapterError> {
        let state = self.state.lock().await;
        let state = state.as_ref().ok_or_else(not_launched)?;
        state
            .tabs
            .get(state.active)
            .cloned()
            .ok_or_else(|| AdapterError::new(AdapterErrorKind::TabNotFound).with_hint("no active tab"))
    }

    /// Open a tab and make it active; returns its index
    pub async fn open_tab(&self, url: Option<&str>) -> Result<usize, AdapterError> {
        let mut state = self.state.lock().await;
        let state = state.as_mut().ok_or_else(not_launched)?;
        let page = state
            .browser
            .new_page(url.unwrap_or("about:blank"))
            .await
            .map_err(|err| AdapterError::cdp("open tab", err))?;
        state.tabs.push(page);
        state.active = state.tabs.len() - 1;
        debug!(tab = state.active, "tab opened");
        Ok(state.active)
    }

    pub async fn switch_tab(&self, index: usize) -> Result<(), AdapterError> {
        let mut state = self.state.lock().await;
        let state = state.as_mut().ok_or_else(not_launched)?;
        let page = state
            .tabs
            .get(index)
            .ok_or_else(|| tab_not_found(index, state.tabs.len()))?;
        if let Err(err) = page.bring_to_front().await {
            warn!(tab = index, error = %err, "bring_to_front failed");
        }
        state.active = index;
        Ok(())
    }

    /// Close a tab (the active one when `index` is `None`).
    ///
    /// Closing the last tab is refused; the session always keeps one page.
    pub async fn close_tab(&self, index: Option<usize>) -> Result<(), AdapterError> {
        let mut state = self.state.lock().await;
        let state = state.as_mut().ok_or_else(not_launched)?;
        let index = index.unwrap_or(state.active);
        if index >= state.tabs.len() {
            return Err(tab_not_found(index, state.tabs.len()));
        }
        if state.tabs.len() == 1 {
            return Err(AdapterError::new(AdapterErrorKind::TabNotFound)
                .with_hint("refusing to close the only tab"));
        }
        let page = state.tabs.remove(index);
        if state.active >= index && state.active > 0 {
            state.active -= 1;
        }
        page.close()
            .await
            .map_err(|err| AdapterError::cdp("close tab", err))
    }

    pub async fn tab_count(&self) -> usize {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|state| state.tabs.len())
            .unwrap_or(0)
    }
}

fn not_launched() -> AdapterError {
    AdapterError::new(AdapterErrorKind::NotLaunched).with_hint("call launch first")
}

fn tab_not_found(index: usize, len: usize) -> AdapterError {
    AdapterError::new(AdapterErrorKind::TabNotFound).with_hint(format!("index {index} of {len} tabs"))
}
