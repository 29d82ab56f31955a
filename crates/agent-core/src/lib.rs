//! External collaborator contracts for the surefoot execution engine.
//!
//! The engine consumes three text-generation collaborators through narrow traits:
//! [`TaskPlanner`] (task decomposition, re-analysis, intent summaries), [`VisionAnalyzer`]
//! (screenshot diagnosis) and [`RemediationAuthor`] (short DOM remediation scripts). Every
//! response is treated as untrusted text and parsed leniently.

pub mod descriptor;
pub mod errors;
pub mod mock;
pub mod openai;
pub mod planner;
pub mod remediation;
pub mod utils;
pub mod vision;

pub use descriptor::StepDescriptor;
pub use errors::AgentError;
pub use mock::MockLlmProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use planner::{bootstrap_plan, plan_or_bootstrap, FailureAnalysis, TaskPlanner};
pub use remediation::{extract_script, remediation_prompt, RemediationAuthor, RemediationRequest};
pub use utils::{extract_json_object, strip_code_fence, truncate_chars};
pub use vision::{
    diagnosis_prompt, parse_diagnosis, CaptchaReport, VisionAnalyzer, VisionDiagnosis,
};
