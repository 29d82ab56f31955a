use action_primitives::{SandboxOutcome, SandboxedScript};
use agent_core::{extract_script, truncate_chars, RemediationRequest};
use async_trait::async_trait;
use serde_json::json;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::{RecoveryContext, RecoveryStrategy};
use crate::types::{LadderOutcome, RecoveryTier};

/// Tier 2: a bounded loop where the remediation author writes a DOM script, the script runs in
/// the sandbox, and the original action is retried.
pub struct AutonomousRecovery;

#[async_trait]
impl RecoveryStrategy for AutonomousRecovery {
    fn tier(&self) -> RecoveryTier {
        RecoveryTier::AutonomousRecovery
    }

    fn is_available(&self, ctx: &RecoveryContext<'_>) -> bool {
        ctx.env.remediation.is_some() && ctx.config.autonomous_max_iterations > 0
    }

    async fn attempt(&self, ctx: &mut RecoveryContext<'_>) -> Option<LadderOutcome> {
        let author = ctx.env.remediation.clone()?;
        let mut previous_outcome: Option<String> = None;

        for iteration in 1..=ctx.config.autonomous_max_iterations {
            let capture = ctx
                .env
                .driver
                .capture_failure_context(&ctx.description)
                .await
                .unwrap_or_default();
            ctx.run.record_screenshot(capture.screenshot_path.clone());

            let request = RemediationRequest {
                step_description: ctx.description.clone(),
                error: ctx.error.to_string(),
                url: capture.url,
                dom_excerpt: truncate_chars(&capture.html, ctx.config.dom_excerpt_chars),
                screenshot_path: capture.screenshot_path,
                iteration,
                previous_outcome: previous_outcome.take(),
            };

            let raw = match author.author(&request).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(step = ctx.index, iteration, error = %err, "remediation author unavailable");
                    return None;
                }
            };
            let Some(source) = extract_script(&raw) else {
                debug!(step = ctx.index, iteration, "no script in remediation answer");
                previous_outcome = Some("no script was returned".to_string());
                continue;
            };
            let script = match SandboxedScript::prepare(&source, &ctx.config.script_policy) {
                Ok(script) => script,
                Err(err) => {
                    warn!(step = ctx.index, iteration, error = %err, "remediation script rejected");
                    previous_outcome = Some(err.to_string());
                    continue;
                }
            };

            let limit = Duration::from_millis(ctx.config.remediation_timeout_ms);
            let outcome = match timeout(limit, ctx.env.driver.evaluate(&script.wrapped())).await {
                Err(_) => format!("script timed out after {}ms", ctx.config.remediation_timeout_ms),
                Ok(Err(err)) => err.to_string(),
                Ok(Ok(value)) => match SandboxOutcome::from_value(value).into_result() {
                    Ok(()) => "script ran".to_string(),
                    Err(err) => err.to_string(),
                },
            };
            ctx.emit_analysis(
                format!("Remediation script {iteration}"),
                json!({ "iteration": iteration, "outcome": outcome }),
            );

            match ctx.retry_original().await {
                Ok(report) => {
                    info!(step = ctx.index, iteration, "Autonomous recovery succeeded");
                    return Some(LadderOutcome::Recovered {
                        tier: self.tier(),
                        report: Box::new(report),
                    });
                }
                Err(err) => {
                    debug!(step = ctx.index, iteration, error = %err, "retry after remediation failed");
                    previous_outcome = Some(format!("{outcome}; retry failed: {err}"));
                    ctx.error = err;
                }
            }
        }
        None
    }
}
