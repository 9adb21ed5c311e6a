//! Error types for murmur.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the murmur domain.
///
/// Generation failures are not represented here. They are absorbed by the
/// fallback controller (see [`crate::model::FallbackError`]) and turned
/// into sentinel turns rather than propagated.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MurmurError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "template"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persona record failed validation
    #[error("Invalid persona '{persona}': {reason}")]
    InvalidPersona { persona: String, reason: String },

    /// Prompt composition failed
    #[error("Prompt composition error: {0}")]
    Compose(String),

    /// An orchestration cycle is already in flight
    #[error("A conversation cycle is already in progress")]
    Busy,
}

impl MurmurError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_persona(persona: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPersona {
            persona: persona.into(),
            reason: reason.into(),
        }
    }

    pub fn compose(message: impl Into<String>) -> Self {
        Self::Compose(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MurmurError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MurmurError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for MurmurError {
    fn from(err: minijinja::Error) -> Self {
        Self::Serialization {
            format: "template".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, MurmurError>`.
pub type Result<T> = std::result::Result<T, MurmurError>;
