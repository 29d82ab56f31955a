use async_trait::async_trait;
use serde_json::json;
use surefoot_core_types::{Action, ElementCategory, ElementTarget, Step};
use tracing::{debug, info, warn};

use super::{RecoveryContext, RecoveryStrategy};
use crate::types::{rank_options, LadderOutcome, RecoveryOption, RecoveryOptionKind, RecoveryTier};

const ALT_SELECTOR_LIMIT: usize = 5;
const SKIP_CONFIDENCE: f64 = 0.1;

/// Tier 3: rank recovery options and apply the best one.
///
/// Skip-step and repeats of an option already applied to this step are held back as the
/// fallback when a vision collaborator can look first.
pub struct StructuredRecovery;

impl StructuredRecovery {
    async fn collect_options(&self, ctx: &RecoveryContext<'_>) -> Vec<RecoveryOption> {
        let mut options = Vec::new();
        let action = ctx.action();

        if let Some(option) = self.alt_selectors(ctx, action.as_ref()).await {
            options.push(option);
        }

        if ctx.run.applied_count(&ctx.step_id, RecoveryOptionKind::DismissOverlay) == 0
            && ctx.can_insert(2)
        {
            match ctx.env.driver.detect_overlay().await {
                Ok(report) if report.present => {
                    let dismiss = match report.close_selector {
                        Some(selector) => Action::click(
                            ElementTarget::new(selector).with_category(ElementCategory::Close),
                        ),
                        None => Action::press(ctx.config.quick_dismiss_key.clone()),
                    };
                    let kind = report.kind.unwrap_or_else(|| "overlay".to_string());
                    options.push(
                        RecoveryOption::new(
                            RecoveryOptionKind::DismissOverlay,
                            format!("Dismiss {kind} and retry"),
                            0.75,
                            format!("{kind} covers the page"),
                        )
                        .with_actions(vec![dismiss, Action::wait(ctx.config.stabilization_wait_ms)]),
                    );
                }
                Ok(_) => {}
                Err(err) => debug!(step = ctx.index, error = %err, "overlay probe failed"),
            }
        }

        if ctx.can_insert(1) {
            let wait_ms = ctx.config.inserted_wait_ms;
            let confidence = if ctx.error.is_retryable() { 0.6 } else { 0.3 };
            options.push(
                RecoveryOption::new(
                    RecoveryOptionKind::WaitThenRetry,
                    format!("Wait {wait_ms}ms and retry"),
                    confidence,
                    "page may still be loading",
                )
                .with_actions(vec![Action::wait(wait_ms)]),
            );
        }

        if let Some(option) = self.planner_alternative(ctx).await {
            options.push(option);
        }

        options.push(RecoveryOption::new(
            RecoveryOptionKind::SkipStep,
            "Skip this step",
            SKIP_CONFIDENCE,
            "no better option",
        ));
        options
    }

    async fn alt_selectors(
        &self,
        ctx: &RecoveryContext<'_>,
        action: Option<&Action>,
    ) -> Option<RecoveryOption> {
        let resolver = ctx.env.resolver.as_ref()?;
        let action = action?;
        let target = action.target()?;
        if ctx.run.applied_count(&ctx.step_id, RecoveryOptionKind::AltSelectors) > 0 {
            return None;
        }

        let exclude: Vec<String> = target.selectors.primary().map(str::to_string).into_iter().collect();
        let alternatives = resolver
            .visible_alternatives(target, &exclude, ALT_SELECTOR_LIMIT)
            .await;
        if alternatives.is_empty() {
            return None;
        }

        let mut rewritten = action.clone();
        if let Some(target) = rewritten.target_mut() {
            target.selectors = target.selectors.promote(&alternatives);
        }
        Some(
            RecoveryOption::new(
                RecoveryOptionKind::AltSelectors,
                format!("Retry with {}", alternatives.join(" | ")),
                0.85,
                "alternative candidates are visible",
            )
            .with_actions(vec![rewritten]),
        )
    }

    async fn planner_alternative(&self, ctx: &RecoveryContext<'_>) -> Option<RecoveryOption> {
        let planner = ctx.env.planner.as_ref()?;
        if ctx.run.applied_count(&ctx.step_id, RecoveryOptionKind::PlannerAlternative) > 0 {
            return None;
        }

        let url = ctx.env.driver.current_url().await.ok();
        let html = ctx.env.driver.page_html().await.unwrap_or_default();
        let analysis = ctx.failure_analysis(url, &html);
        let descriptor = match planner.suggest_alternative(&analysis).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return None,
            Err(err) => {
                debug!(step = ctx.index, error = %err, "planner alternative unavailable");
                return None;
            }
        };
        match descriptor.to_action() {
            Ok(Some(action)) => Some(
                RecoveryOption::new(
                    RecoveryOptionKind::PlannerAlternative,
                    if descriptor.description.is_empty() {
                        action.describe()
                    } else {
                        descriptor.description.clone()
                    },
                    0.5,
                    "planner proposed another approach",
                )
                .with_actions(vec![action]),
            ),
            Ok(None) => None,
            Err(err) => {
                debug!(step = ctx.index, error = %err, "unusable planner alternative");
                None
            }
        }
    }
}

#[async_trait]
impl RecoveryStrategy for StructuredRecovery {
    fn tier(&self) -> RecoveryTier {
        RecoveryTier::StructuredOptions
    }

    async fn attempt(&self, ctx: &mut RecoveryContext<'_>) -> Option<LadderOutcome> {
        let mut options = self.collect_options(ctx).await;
        rank_options(&mut options);
        ctx.emit_analysis(
            "Recovery options",
            json!({
                "options": options
                    .iter()
                    .map(|option| json!({ "id": option.id(), "confidence": option.confidence }))
                    .collect::<Vec<_>>()
            }),
        );

        let top = options.into_iter().next()?;
        let repeat = ctx.run.applied_count(&ctx.step_id, top.kind) > 0;
        if (top.kind == RecoveryOptionKind::SkipStep || repeat) && ctx.env.vision.is_some() {
            debug!(step = ctx.index, option = top.id(), repeat, "deferring to vision diagnosis");
            ctx.fallback = Some(top);
            return None;
        }
        Some(apply_option(ctx, top))
    }
}

/// Apply a structured option to the plan.
pub(crate) fn apply_option(ctx: &mut RecoveryContext<'_>, option: RecoveryOption) -> LadderOutcome {
    let tier = RecoveryTier::StructuredOptions;
    ctx.run.record_applied(&ctx.step_id, option.kind);
    info!(
        step = ctx.index,
        option = option.id(),
        confidence = option.confidence,
        "Applying recovery option: {}",
        option.description
    );

    match option.kind {
        RecoveryOptionKind::AltSelectors | RecoveryOptionKind::PlannerAlternative => {
            match option.actions.into_iter().next() {
                Some(action) => {
                    ctx.replace_action(action);
                    LadderOutcome::RetryNow {
                        tier,
                        reason: option.reason,
                    }
                }
                None => LadderOutcome::Advance {
                    tier,
                    reason: format!("{} carried no action", option.kind),
                },
            }
        }
        RecoveryOptionKind::DismissOverlay | RecoveryOptionKind::WaitThenRetry => {
            let description = option.description.clone();
            let steps: Vec<Step> = option
                .actions
                .into_iter()
                .map(|action| match action {
                    Action::Wait { duration_ms } => Step::wait(duration_ms),
                    other => Step::new(format!("{description}: {}", other.describe()), other),
                })
                .collect();
            match ctx.insert_steps(steps) {
                Ok(inserted) => LadderOutcome::Mutated {
                    tier,
                    inserted,
                    reason: option.reason,
                },
                Err(err) => {
                    warn!(step = ctx.index, error = %err, "recovery insertion rejected");
                    LadderOutcome::Advance {
                        tier,
                        reason: err.to_string(),
                    }
                }
            }
        }
        RecoveryOptionKind::SkipStep => LadderOutcome::Advance {
            tier,
            reason: option.reason,
        },
    }
}
