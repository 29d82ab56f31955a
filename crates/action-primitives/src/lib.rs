//! Browser driver contract for the surefoot execution engine
//!
//! This crate defines what the controller needs from a browser:
//! - [`BrowserDriver`]: execute an [`Action`](surefoot_core_types::Action), screenshots, page
//!   HTML, script evaluation and failure-context capture
//! - [`ActionError`]: the driver-side error taxonomy with retryability hints
//! - [`ScriptPolicy`] / [`SandboxedScript`]: the DOM-only envelope for remediation scripts
//! - an overlay probe used to decide whether dismissing an overlay is worth trying

pub mod driver;
pub mod errors;
pub mod overlay;
pub mod sandbox;
pub mod types;

pub use driver::*;
pub use errors::*;
pub use overlay::*;
pub use sandbox::*;
pub use types::*;
