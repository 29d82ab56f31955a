//! Shared plan model for the surefoot execution engine.
//!
//! The types here carry no behaviour beyond bookkeeping: an [`Action`] describes one browser
//! operation, a [`Step`] wraps an action with completion state, and a [`Plan`] is the ordered,
//! insertable list of steps a run mutates. [`ExecutionResult`] is the immutable record a run
//! produces.

pub mod action;
pub mod plan;
pub mod result;

pub use action::{Action, ElementCategory, ElementTarget, ScrollDirection, SelectorSet};
pub use plan::{Plan, PlanError, Step, StepId};
pub use result::{ExecutionResult, StepResult};
