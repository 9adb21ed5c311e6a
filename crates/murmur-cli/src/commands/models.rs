use anyhow::Result;
use colored::Colorize;

use crate::runtime::{self, GlobalOpts};

/// Prints the model table in priority order.
pub async fn run(opts: &GlobalOpts) -> Result<()> {
    let settings = runtime::load_settings(opts).await?;
    let config = &settings.models;

    let mut models: Vec<_> = config.models.iter().collect();
    models.sort_by_key(|m| m.priority);

    for model in models {
        let marker = if model.id == config.primary { "*" } else { " " };
        let chain = if model.fallback_chain.is_empty() {
            "(no fallback)".to_string()
        } else {
            format!("-> {}", model.fallback_chain.join(" -> "))
        };
        println!(
            "{} {:<20} {:<18} {}",
            marker,
            model.id.bold(),
            model.display_name,
            chain.bright_black()
        );
    }

    println!();
    println!(
        "cooldown {}s, auto fallback {}",
        config.cooldown_secs,
        if config.auto_fallback { "on" } else { "off" }
    );
    Ok(())
}
