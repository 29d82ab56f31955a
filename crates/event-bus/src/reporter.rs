use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::bus::InMemoryBus;
use crate::errors::ReporterError;
use crate::event::{ProgressEvent, ProgressEventKind};

/// Receives progress events. Implementations must not assume acknowledgement is awaited.
pub trait ProgressListener: Send + Sync {
    fn name(&self) -> &str {
        "listener"
    }

    fn on_event(&self, event: &ProgressEvent) -> Result<(), ReporterError>;
}

/// Fan-out sink for progress events.
///
/// Every listener is invoked in registration order. A listener that errors or panics is logged
/// and skipped; the remaining listeners still receive the event and `emit` never fails.
#[derive(Default)]
pub struct ProgressReporter {
    listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
    bus: Option<Arc<InMemoryBus<ProgressEvent>>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward events onto a broadcast bus
    pub fn with_bus(mut self, bus: Arc<InMemoryBus<ProgressEvent>>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_listener(self, listener: Arc<dyn ProgressListener>) -> Self {
        self.add_listener(listener);
        self
    }

    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn emit(&self, event: ProgressEvent) {
        let listeners: Vec<Arc<dyn ProgressListener>> = self.listeners.read().clone();
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_event(&event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(listener = listener.name(), error = %err, "progress listener failed");
                }
                Err(_) => {
                    warn!(listener = listener.name(), "progress listener panicked");
                }
            }
        }

        if let Some(bus) = &self.bus {
            if let Err(err) = bus.send_now(event) {
                debug!(error = %err, "progress event dropped");
            }
        }
    }
}

/// Mirrors progress events into the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ProgressListener for TracingListener {
    fn name(&self) -> &str {
        "tracing"
    }

    fn on_event(&self, event: &ProgressEvent) -> Result<(), ReporterError> {
        let step = event.step_index + 1;
        match event.kind {
            ProgressEventKind::StepFailed | ProgressEventKind::Retry => warn!(
                kind = event.kind.as_str(),
                step,
                total = event.total_steps,
                details = ?event.details,
                "{}",
                event.description
            ),
            _ => info!(
                kind = event.kind.as_str(),
                step,
                total = event.total_steps,
                "{}",
                event.description
            ),
        }
        Ok(())
    }
}

/// Keeps every event in memory; handy for result rendering and tests
#[derive(Debug, Default)]
pub struct MemoryListener {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemoryListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: ProgressEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl ProgressListener for MemoryListener {
    fn name(&self) -> &str {
        "memory"
    }

    fn on_event(&self, event: &ProgressEvent) -> Result<(), ReporterError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Adapts a closure into a listener
pub struct FnListener<F> {
    name: String,
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ProgressEvent) -> Result<(), ReporterError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            callback,
        })
    }
}

impl<F> ProgressListener for FnListener<F>
where
    F: Fn(&ProgressEvent) -> Result<(), ReporterError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &ProgressEvent) -> Result<(), ReporterError> {
        (self.callback)(event)
    }
}
