use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ReporterError {
    #[error("no active subscribers")]
    NoSubscribers,

    #[error("listener '{listener}' failed: {message}")]
    Listener { listener: String, message: String },
}

impl ReporterError {
    pub fn listener(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            listener: listener.into(),
            message: message.into(),
        }
    }
}
