//! TOML-based settings loading.

use std::path::PathBuf;

use murmur_core::config::MurmurSettings;
use murmur_core::error::Result;

use crate::paths::MurmurPaths;
use crate::storage::{read_optional, write_atomic};

/// Reads and writes `settings.toml`.
pub struct TomlSettingsRepository {
    path: PathBuf,
}

impl TomlSettingsRepository {
    /// Creates a repository for `~/.config/murmur/settings.toml`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: MurmurPaths::default().settings_file()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads and validates the settings; a missing file yields the defaults.
    pub async fn load(&self) -> Result<MurmurSettings> {
        let settings = match read_optional(&self.path).await? {
            Some(content) => {
                tracing::debug!("[Settings] Loading {}", self.path.display());
                toml::from_str(&content)?
            }
            None => {
                tracing::debug!(
                    "[Settings] {} not found, using defaults",
                    self.path.display()
                );
                MurmurSettings::default()
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validates and writes `settings` atomically.
    pub async fn save(&self, settings: &MurmurSettings) -> Result<()> {
        settings.validate()?;
        let content = toml::to_string_pretty(settings)?;
        write_atomic(&self.path, content.as_bytes()).await
    }
}
