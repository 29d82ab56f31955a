//! Library side of the `surefoot` binary: configuration loading and run wiring.

pub mod config;
pub mod runtime;

pub use config::{load_config, AppConfig, LlmSettings};
pub use runtime::{build_plan, init_logging, model_collaborators, run_task, ModelCollaborators};
