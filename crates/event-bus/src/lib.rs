//! Progress reporting for the surefoot execution engine.
//!
//! The controller emits [`ProgressEvent`]s through a [`ProgressReporter`]. Delivery is
//! one-way: listener errors and panics are logged and swallowed, and a bus without subscribers
//! is not an error for the emitter.

pub mod bus;
pub mod errors;
pub mod event;
pub mod reporter;

pub use bus::{to_mpsc, Event, EventBus, InMemoryBus};
pub use errors::ReporterError;
pub use event::{ProgressEvent, ProgressEventKind};
pub use reporter::{FnListener, MemoryListener, ProgressListener, ProgressReporter, TracingListener};
