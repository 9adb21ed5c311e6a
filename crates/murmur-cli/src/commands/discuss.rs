//! One-shot discussion.

use std::collections::HashMap;

use anyhow::Result;
use murmur_application::DeliveryDispatcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::render;
use crate::runtime::{self, GlobalOpts};

/// Runs one discussion on `topic` and prints the turns as they are released.
///
/// Ctrl-C cancels the generation in progress.
pub async fn run(opts: &GlobalOpts, topic: &str) -> Result<()> {
    let orchestrator = runtime::build_orchestrator(opts).await?;
    let colors: HashMap<String, Option<String>> = orchestrator
        .registry()
        .iter()
        .map(|p| (p.id.clone(), p.color.clone()))
        .collect();

    println!("{}", render::system_line(&format!("📢 Discussion topic: {topic}")));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let model_before = orchestrator.active_model();
    let report = orchestrator.discuss(topic, &cancel).await?;
    if report.model_after != model_before {
        println!(
            "{}",
            render::system_line(&format!(
                "Switched to {} after {} failed.",
                report.model_after, model_before
            ))
        );
    }

    let (tx, mut turns) = mpsc::channel(16);
    let delivery = DeliveryDispatcher::new(tx)
        .with_shutdown(cancel.clone())
        .dispatch(report.plan);

    while let Some(turn) = turns.recv().await {
        let color = colors.get(&turn.persona_id).and_then(|c| c.as_deref());
        println!("{}", render::turn_line(&turn, color));
    }
    delivery.await?;

    tracing::info!("[CLI] Discussion finished on {}", report.model_after);
    Ok(())
}
