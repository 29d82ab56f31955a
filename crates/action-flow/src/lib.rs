//! Step execution and recovery
//!
//! [`StepExecutionController`] drives a [`Plan`](surefoot_core_types::Plan) to completion with
//! an explicit cursor-based state machine. When a step fails, the [`RecoveryLadder`] tries four
//! tiers in fixed order (quick dismiss, autonomous remediation, structured recovery options,
//! vision diagnosis) and answers with one of: recovered, retry now, advance, or plan mutated.
//! Runs always terminate; only a browser that cannot start aborts a run.

pub mod artifact;
pub mod config;
pub mod env;
pub mod errors;
pub mod executor;
pub mod run;
pub mod strategies;
pub mod types;

pub use config::ExecutionConfig;
pub use env::Collaborators;
pub use errors::FlowError;
pub use executor::StepExecutionController;
pub use run::RunState;
pub use strategies::{
    AutonomousRecovery, QuickDismiss, RecoveryContext, RecoveryLadder, RecoveryStrategy,
    StructuredRecovery, VisionDiagnostic,
};
pub use types::{LadderOutcome, RecoveryOption, RecoveryOptionKind, RecoveryTier};
