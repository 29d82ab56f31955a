//! Adaptive selector resolution
//!
//! Given an ordered candidate set, the [`SelectorResolver`] returns the first candidate that
//! exists and becomes visible within a short bounded wait. When every explicit candidate fails
//! and the target carries an [`ElementCategory`](surefoot_core_types::ElementCategory) hint, a
//! fixed list of heuristic locators for that category is tried in the same first-match order.
//!
//! Locator strings support four forms:
//! - plain CSS (`#search`, `input[name=q]`), optionally prefixed with `css=`
//! - ARIA role with optional accessible name: `role=textbox[name=/search|find/i]`
//! - text content: `text=Sign in` (partial) or `text="Sign in"` (exact)
//! - XPath: `xpath=//button` or any string starting with `//`

pub mod errors;
pub mod heuristics;
pub mod probe;
pub mod resolver;
pub mod types;

pub use errors::*;
pub use heuristics::*;
pub use probe::*;
pub use resolver::*;
pub use types::*;
