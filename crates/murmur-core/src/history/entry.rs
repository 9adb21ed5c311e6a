use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interest::InterestLevel;
use crate::turn::Turn;

/// Who said something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Speaker {
    User,
    Persona { id: String, name: String },
    System,
}

impl Speaker {
    /// Label used when the entry is rendered into a prompt.
    pub fn label(&self) -> &str {
        match self {
            Speaker::User => "User",
            Speaker::Persona { name, .. } => name,
            Speaker::System => "System",
        }
    }

    pub fn persona_id(&self) -> Option<&str> {
        match self {
            Speaker::Persona { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// One persisted line of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<InterestLevel>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
            interest: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker: Speaker::System,
            text: text.into(),
            timestamp: Utc::now(),
            interest: None,
        }
    }
}

impl From<&Turn> for HistoryEntry {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id.clone(),
            speaker: Speaker::Persona {
                id: turn.persona_id.clone(),
                name: turn.persona_name.clone(),
            },
            text: turn.text.clone(),
            timestamp: turn.timestamp,
            interest: Some(turn.interest),
        }
    }
}
