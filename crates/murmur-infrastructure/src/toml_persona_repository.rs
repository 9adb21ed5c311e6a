//! TOML-based PersonaRepository implementation

use std::path::PathBuf;

use murmur_core::config::PersonaRoster;
use murmur_core::error::Result;
use murmur_core::persona::{Persona, PersonaRepository, default_roster};

use crate::paths::MurmurPaths;
use crate::storage::read_optional;

/// Loads the roster from a `personas.toml` file of `[[persona]]` tables.
///
/// A missing or empty file yields the built-in roster. Validation is left to
/// `PersonaRegistry::new`, which every caller goes through.
pub struct TomlPersonaRepository {
    path: PathBuf,
}

impl TomlPersonaRepository {
    /// Creates a repository reading `~/.config/murmur/personas.toml`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: MurmurPaths::default().personas_file()?,
        })
    }

    /// Creates a repository with a custom roster path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait::async_trait]
impl PersonaRepository for TomlPersonaRepository {
    async fn get_all(&self) -> Result<Vec<Persona>> {
        let Some(content) = read_optional(&self.path).await? else {
            tracing::info!(
                "[Personas] {} not found, using built-in roster",
                self.path.display()
            );
            return Ok(default_roster());
        };

        let roster: PersonaRoster = toml::from_str(&content)?;
        if roster.personas.is_empty() {
            tracing::info!(
                "[Personas] {} has no [[persona]] entries, using built-in roster",
                self.path.display()
            );
            return Ok(default_roster());
        }

        tracing::info!(
            "[Personas] Loaded {} personas from {}",
            roster.personas.len(),
            self.path.display()
        );
        Ok(roster.personas)
    }
}
