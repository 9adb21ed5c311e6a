//! Generated turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interest::InterestLevel;

/// Text shown when a persona could not produce a reply.
pub const APOLOGY_TEXT: &str = "Sorry, I'm having trouble responding right now.";

/// Text shown when a cycle was cancelled before a persona spoke.
pub const CANCELLED_TEXT: &str = "(generation cancelled)";

/// What a turn represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnKind {
    /// Generated text from the persona
    Spoken,
    /// Generation failed; the text is a user-facing apology
    Apology,
    /// The cycle was cancelled while this persona was generating
    Cancelled,
}

/// One persona utterance on its way to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub persona_id: String,
    pub persona_name: String,
    pub text: String,
    /// Set to the release time once the turn has been scheduled.
    pub timestamp: DateTime<Utc>,
    pub interest: InterestLevel,
    pub kind: TurnKind,
    /// Model that produced the text, for spoken turns
    pub model: Option<String>,
}

impl Turn {
    fn new(
        persona_id: &str,
        persona_name: &str,
        text: String,
        interest: InterestLevel,
        kind: TurnKind,
        model: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            persona_id: persona_id.to_string(),
            persona_name: persona_name.to_string(),
            text,
            timestamp: Utc::now(),
            interest,
            kind,
            model,
        }
    }

    pub fn spoken(
        persona_id: &str,
        persona_name: &str,
        text: impl Into<String>,
        interest: InterestLevel,
        model: impl Into<String>,
    ) -> Self {
        Self::new(
            persona_id,
            persona_name,
            text.into(),
            interest,
            TurnKind::Spoken,
            Some(model.into()),
        )
    }

    pub fn apology(persona_id: &str, persona_name: &str, interest: InterestLevel) -> Self {
        Self::new(
            persona_id,
            persona_name,
            APOLOGY_TEXT.to_string(),
            interest,
            TurnKind::Apology,
            None,
        )
    }

    pub fn cancelled(persona_id: &str, persona_name: &str, interest: InterestLevel) -> Self {
        Self::new(
            persona_id,
            persona_name,
            CANCELLED_TEXT.to_string(),
            interest,
            TurnKind::Cancelled,
            None,
        )
    }

    pub fn is_spoken(&self) -> bool {
        self.kind == TurnKind::Spoken
    }
}
