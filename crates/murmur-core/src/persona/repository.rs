//! Persona repository trait.

use super::model::Persona;
use crate::error::Result;

/// Source of the persona roster.
///
/// The roster is read once at startup; implementations decide where it lives
/// (a TOML file, the built-in presets, a test fixture).
#[async_trait::async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Loads every configured persona, in roster order.
    async fn get_all(&self) -> Result<Vec<Persona>>;
}

/// Repository serving the built-in roster.
#[derive(Debug, Default, Clone, Copy)]
pub struct PresetPersonaRepository;

#[async_trait::async_trait]
impl PersonaRepository for PresetPersonaRepository {
    async fn get_all(&self) -> Result<Vec<Persona>> {
        Ok(super::preset::default_roster())
    }
}
