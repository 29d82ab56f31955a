use async_trait::async_trait;
use surefoot_core_types::Action;
use tokio::time::{sleep, Duration};
use tracing::debug;

use super::{RecoveryContext, RecoveryStrategy};
use crate::types::{LadderOutcome, RecoveryTier};

/// Tier 1: press the dismiss key, let the page settle, retry once.
pub struct QuickDismiss;

#[async_trait]
impl RecoveryStrategy for QuickDismiss {
    fn tier(&self) -> RecoveryTier {
        RecoveryTier::QuickDismiss
    }

    async fn attempt(&self, ctx: &mut RecoveryContext<'_>) -> Option<LadderOutcome> {
        let dismiss = Action::press(ctx.config.quick_dismiss_key.clone());
        if let Err(err) = ctx
            .run
            .execute_auxiliary(ctx.env.driver.as_ref(), &dismiss)
            .await
        {
            debug!(step = ctx.index, error = %err, "dismiss key failed");
        }
        sleep(Duration::from_millis(ctx.config.stabilization_wait_ms)).await;

        match ctx.retry_original().await {
            Ok(report) => Some(LadderOutcome::Recovered {
                tier: self.tier(),
                report: Box::new(report),
            }),
            Err(err) => {
                debug!(step = ctx.index, error = %err, "retry after quick dismiss failed");
                ctx.error = err;
                None
            }
        }
    }
}
