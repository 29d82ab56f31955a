use agent_core::{diagnosis_prompt, parse_diagnosis};
use async_trait::async_trait;
use serde_json::json;
use surefoot_core_types::Step;
use tracing::{debug, info, warn};

use super::{RecoveryContext, RecoveryStrategy};
use crate::types::{LadderOutcome, RecoveryTier};

const DIAGNOSIS_MAX_TOKENS: u32 = 1000;
const DIAGNOSIS_TEMPERATURE: f32 = 0.2;

/// Tier 4: send a full-page screenshot to the vision collaborator and act on its diagnosis.
///
/// CAPTCHA solution steps above the confidence threshold are inserted; otherwise an alternative
/// action replaces the step behind a settle wait. An unparseable answer inserts a wait.
pub struct VisionDiagnostic;

impl VisionDiagnostic {
    fn insert_wait(&self, ctx: &mut RecoveryContext<'_>, reason: String) -> Option<LadderOutcome> {
        if !ctx.can_insert(1) {
            return None;
        }
        match ctx.insert_steps(vec![Step::wait(ctx.config.inserted_wait_ms)]) {
            Ok(inserted) => Some(LadderOutcome::Mutated {
                tier: self.tier(),
                inserted,
                reason,
            }),
            Err(err) => {
                warn!(step = ctx.index, error = %err, "wait insertion rejected");
                None
            }
        }
    }
}

#[async_trait]
impl RecoveryStrategy for VisionDiagnostic {
    fn tier(&self) -> RecoveryTier {
        RecoveryTier::VisionDiagnostic
    }

    fn is_available(&self, ctx: &RecoveryContext<'_>) -> bool {
        ctx.env.vision.is_some()
    }

    async fn attempt(&self, ctx: &mut RecoveryContext<'_>) -> Option<LadderOutcome> {
        let vision = ctx.env.vision.clone()?;
        let capture = match ctx.env.driver.capture_failure_context(&ctx.description).await {
            Ok(capture) => capture,
            Err(err) => {
                warn!(step = ctx.index, error = %err, "failure capture failed");
                return None;
            }
        };
        ctx.run.record_screenshot(capture.screenshot_path.clone());
        let Some(screenshot) = capture.screenshot_path.as_deref() else {
            debug!(step = ctx.index, "no screenshot for vision diagnosis");
            return None;
        };

        let prompt = diagnosis_prompt(
            &ctx.description,
            &ctx.error.to_string(),
            &capture.html,
            ctx.config.dom_excerpt_chars,
        );
        let raw = match vision
            .analyze(
                screenshot,
                &prompt,
                Some(DIAGNOSIS_MAX_TOKENS),
                Some(DIAGNOSIS_TEMPERATURE),
            )
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(step = ctx.index, error = %err, "vision analysis unavailable");
                return None;
            }
        };

        let diagnosis = match parse_diagnosis(&raw) {
            Ok(diagnosis) => diagnosis,
            Err(err) => {
                warn!(step = ctx.index, error = %err, "unparseable diagnosis, inserting wait");
                return self.insert_wait(ctx, format!("diagnosis unparseable: {err}"));
            }
        };
        ctx.emit_analysis(
            "Vision diagnosis",
            serde_json::to_value(&diagnosis).unwrap_or_else(|_| json!({})),
        );

        if let Some(steps) = diagnosis.captcha_steps(ctx.config.captcha_confidence_threshold) {
            if ctx.can_insert(steps.len()) {
                let kind = diagnosis.captcha.kind.clone().unwrap_or_else(|| "captcha".to_string());
                match ctx.insert_steps(steps) {
                    Ok(inserted) => {
                        info!(step = ctx.index, inserted, "Inserted {} solving steps", kind);
                        return Some(LadderOutcome::Mutated {
                            tier: self.tier(),
                            inserted,
                            reason: format!("{kind} detected"),
                        });
                    }
                    Err(err) => warn!(step = ctx.index, error = %err, "captcha insertion rejected"),
                }
            } else {
                debug!(step = ctx.index, "captcha steps exceed insertion budget");
            }
        }

        let alternative = diagnosis
            .alternative_action
            .as_ref()
            .and_then(|descriptor| descriptor.to_action().ok().flatten());
        if let Some(action) = alternative {
            info!(step = ctx.index, action = %action.describe(), "Vision proposed alternative action");
            ctx.replace_action(action);
            let reason = diagnosis
                .failure_reason
                .clone()
                .unwrap_or_else(|| "vision proposed an alternative".to_string());
            return self.insert_wait(ctx, reason.clone()).or(Some(LadderOutcome::RetryNow {
                tier: self.tier(),
                reason,
            }));
        }

        debug!(step = ctx.index, "vision diagnosis offered nothing actionable");
        None
    }
}
