//! Chromium DevTools driver for surefoot.
//!
//! [`ChromiumDriver`] implements [`BrowserDriver`](action_primitives::BrowserDriver) over
//! chromiumoxide. It owns a [`BrowserSession`] (browser process, handler task, tabs) and a
//! [`SelectorResolver`](action_locator::SelectorResolver) whose probe evaluates locator scripts
//! in the active tab.

pub mod config;
pub mod driver;
pub mod error;
pub mod probe;
pub mod script;
pub mod session;

pub use config::{detect_chrome_executable, CdpConfig};
pub use driver::ChromiumDriver;
pub use error::{AdapterError, AdapterErrorKind};
pub use probe::SessionProbe;
pub use session::BrowserSession;
