//! Background chatter between the personas.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::DeliveryDispatcher;
use crate::orchestrator::ConversationOrchestrator;

/// Starts the auto-chat loop.
///
/// Every `min_interval_secs..=max_interval_secs` seconds, unless a cycle is
/// already running, the personas either drill into a recurring keyword (with
/// `drill_probability`, when there are keywords) or chat about a random topic.
/// Resulting plans go to `dispatcher`. The loop, and any cycle it started,
/// stops when `cancel` fires. Returns at once when auto-chat is disabled.
pub fn spawn_auto_chat(
    orchestrator: Arc<ConversationOrchestrator>,
    dispatcher: DeliveryDispatcher,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let auto = orchestrator.settings().auto_chat.clone();
        if !auto.enabled {
            tracing::info!("[AutoChat] Disabled");
            return;
        }
        tracing::info!(
            "[AutoChat] Started ({}-{}s interval)",
            auto.min_interval_secs,
            auto.max_interval_secs
        );

        loop {
            let delay = orchestrator.auto_chat_delay();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if orchestrator.is_busy() {
                tracing::debug!("[AutoChat] Cycle in flight, skipping tick");
                continue;
            }

            let cycle = cancel.child_token();
            let result = if orchestrator.wants_drill() {
                orchestrator.keyword_drill(&cycle).await
            } else {
                orchestrator.spontaneous(&cycle).await
            };

            match result {
                Ok(report) if !report.plan.is_empty() => {
                    dispatcher.dispatch(report.plan);
                }
                Ok(_) => {}
                Err(e) if e.is_busy() => {
                    tracing::debug!("[AutoChat] Lost the race for the busy flag");
                }
                Err(e) => tracing::error!("[AutoChat] Tick failed: {}", e),
            }
        }

        tracing::info!("[AutoChat] Stopped");
    })
}
