//! Wiring shared by the subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use murmur_application::ConversationOrchestrator;
use murmur_core::config::{GenerationMode, MurmurSettings};
use murmur_core::persona::{PersonaRegistry, PersonaRepository};
use murmur_infrastructure::{
    JsonHistoryStore, MurmurPaths, TomlPersonaRepository, TomlSettingsRepository,
};
use murmur_interaction::GeminiCliService;

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Settings file [default: ~/.config/murmur/settings.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Persona roster file [default: ~/.config/murmur/personas.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub personas: Option<PathBuf>,

    /// Conversation history file [default: ~/.local/share/murmur/history.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Seed for reproducible participant selection and pacing
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Keep the personas quiet unless spoken to
    #[arg(long, global = true)]
    pub no_auto_chat: bool,

    /// Generate each cycle's replies with a single model call
    #[arg(long, global = true)]
    pub batch: bool,
}

impl GlobalOpts {
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings {
            Some(path) => Ok(path.clone()),
            None => Ok(MurmurPaths::default().settings_file()?),
        }
    }

    pub fn personas_path(&self) -> Result<PathBuf> {
        match &self.personas {
            Some(path) => Ok(path.clone()),
            None => Ok(MurmurPaths::default().personas_file()?),
        }
    }

    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history {
            Some(path) => Ok(path.clone()),
            None => Ok(MurmurPaths::default().history_file()?),
        }
    }
}

/// Loads the settings file with command-line overrides applied.
pub async fn load_settings(opts: &GlobalOpts) -> Result<MurmurSettings> {
    let path = opts.settings_path()?;
    let mut settings = TomlSettingsRepository::with_path(path.clone())
        .load()
        .await
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    if let Some(seed) = opts.seed {
        settings.seed = Some(seed);
    }
    if opts.no_auto_chat {
        settings.auto_chat.enabled = false;
    }
    if opts.batch {
        settings.generation.mode = GenerationMode::Batch;
    }
    Ok(settings)
}

pub async fn load_registry(opts: &GlobalOpts) -> Result<PersonaRegistry> {
    let path = opts.personas_path()?;
    let personas = TomlPersonaRepository::with_path(path.clone())
        .get_all()
        .await
        .with_context(|| format!("Failed to load personas from {}", path.display()))?;
    Ok(PersonaRegistry::new(personas)?)
}

/// Builds an orchestrator backed by the gemini CLI and the history file.
pub async fn build_orchestrator(opts: &GlobalOpts) -> Result<Arc<ConversationOrchestrator>> {
    let settings = load_settings(opts).await?;
    let registry = load_registry(opts).await?;

    let service = GeminiCliService::new(settings.generation.binary.clone());
    if !service.is_available().await {
        tracing::warn!(
            "[CLI] '{}' was not found on PATH; every turn will fail",
            service.binary()
        );
    }

    let history = JsonHistoryStore::with_path(opts.history_path()?, settings.history.max_chars);

    let orchestrator =
        ConversationOrchestrator::new(registry, settings, Arc::new(service), Arc::new(history))
            .context("Failed to set up the conversation")?;
    Ok(Arc::new(orchestrator))
}
