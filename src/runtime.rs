//! Logging setup and run wiring

use action_flow::{Collaborators, ExecutionConfig, StepExecutionController};
use agent_core::{
    plan_or_bootstrap, MockLlmProvider, OpenAiProvider, RemediationAuthor, TaskPlanner,
    VisionAnalyzer,
};
use anyhow::{Context, Result};
use cdp_adapter::ChromiumDriver;
use std::sync::Arc;
use surefoot_core_types::{ExecutionResult, Plan};
use surefoot_event_bus::{ProgressReporter, TracingListener};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// Install the global subscriber; `RUST_LOG` wins over `level`, `debug` forces DEBUG.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Planner, vision and remediation collaborators backed by one provider
#[derive(Clone)]
pub struct ModelCollaborators {
    pub planner: Arc<dyn TaskPlanner>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub remediation: Arc<dyn RemediationAuthor>,
    pub offline: bool,
}

impl ModelCollaborators {
    fn from_provider<P>(provider: Arc<P>, offline: bool) -> Self
    where
        P: TaskPlanner + VisionAnalyzer + RemediationAuthor + 'static,
    {
        Self {
            planner: provider.clone(),
            vision: provider.clone(),
            remediation: provider,
            offline,
        }
    }
}

/// OpenAI-compatible provider when a key is configured, the deterministic mock otherwise
pub fn model_collaborators(config: &AppConfig, offline: bool) -> Result<ModelCollaborators> {
    if offline {
        info!("offline mode: using the deterministic mock provider");
        return Ok(ModelCollaborators::from_provider(
            Arc::new(MockLlmProvider::new()),
            true,
        ));
    }
    if !config.has_api_key() {
        warn!("no API key configured; falling back to the mock provider");
        return Ok(ModelCollaborators::from_provider(
            Arc::new(MockLlmProvider::new()),
            true,
        ));
    }
    let provider = OpenAiProvider::new(config.llm.to_provider_config())
        .context("Failed to build model provider")?;
    Ok(ModelCollaborators::from_provider(Arc::new(provider), false))
}

/// Ask the planner for a plan (bootstrap plan on failure)
pub async fn build_plan(models: &ModelCollaborators, task: &str, url: &str) -> Plan {
    plan_or_bootstrap(Some(models.planner.as_ref()), task, url).await
}

/// Plan and execute `task` starting at `url` in a fresh Chromium session
pub async fn run_task(
    config: &AppConfig,
    models: ModelCollaborators,
    task: &str,
    url: &str,
) -> Result<ExecutionResult> {
    let plan = build_plan(&models, task, url).await;
    info!(steps = plan.len(), task, "plan ready");

    let driver = Arc::new(ChromiumDriver::new(config.browser.clone()));
    let reporter = Arc::new(ProgressReporter::new().with_listener(Arc::new(TracingListener)));
    let env = Collaborators::new(driver.clone())
        .with_resolver(driver.resolver())
        .with_planner(models.planner)
        .with_vision(models.vision)
        .with_remediation(models.remediation)
        .with_reporter(reporter);

    let execution: ExecutionConfig = config.execution.clone();
    let mut controller = StepExecutionController::new(plan, env, execution).with_task(task);
    let outcome = controller.execute(Some(url)).await;

    if let Err(err) = driver.close().await {
        warn!(error = %err, "failed to close browser");
    }
    outcome.context("Run aborted")
}
