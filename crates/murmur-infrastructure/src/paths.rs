//! Unified path management for murmur files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/murmur/            # Config directory
//! ├── settings.toml            # MurmurSettings
//! └── personas.toml            # [[persona]] roster (optional)
//!
//! ~/.local/share/murmur/       # Data directory
//! └── history.json             # Conversation log
//! ```
//!
//! A base directory override places everything under one directory, which is
//! what tests use.

use std::path::{Path, PathBuf};

use murmur_core::error::{MurmurError, Result};

const APP_DIR: &str = "murmur";

/// Resolves murmur's file locations.
#[derive(Debug, Clone, Default)]
pub struct MurmurPaths {
    base_dir: Option<PathBuf>,
}

impl MurmurPaths {
    /// Creates a resolver; `base_dir` replaces both platform directories.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g. `~/.config/murmur/`).
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base_dir {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MurmurError::config("Cannot find config directory"))
    }

    /// Returns the data directory (e.g. `~/.local/share/murmur/`).
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(base) = &self.base_dir {
            return Ok(base.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| MurmurError::config("Cannot find data directory"))
    }

    pub fn settings_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("settings.toml"))
    }

    pub fn personas_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("personas.toml"))
    }

    pub fn history_file(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("history.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir_override() {
        let paths = MurmurPaths::new(Some(Path::new("/tmp/murmur-test")));
        assert_eq!(
            paths.settings_file().unwrap(),
            PathBuf::from("/tmp/murmur-test/settings.toml")
        );
        assert_eq!(
            paths.history_file().unwrap(),
            PathBuf::from("/tmp/murmur-test/history.json")
        );
    }

    #[test]
    fn test_default_paths_end_with_app_dir() {
        let paths = MurmurPaths::default();
        if let Ok(file) = paths.personas_file() {
            assert!(file.ends_with("murmur/personas.toml"));
        }
    }
}
