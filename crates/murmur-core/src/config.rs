//! Settings and roster file schemas.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::history::DEFAULT_CONTEXT_WINDOW;
use crate::model::ModelConfig;
use crate::persona::Persona;
use crate::schedule::SchedulerConfig;
use crate::selection::{ParticipationOdds, SelectionPolicy};

/// Root of a persona roster file: a list of `[[persona]]` tables.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PersonaRoster {
    #[serde(rename = "persona", default)]
    pub personas: Vec<Persona>,
}

/// Unprompted chatter: who joins and what it is about.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpontaneousSettings {
    pub odds: ParticipationOdds,
    pub max_participants: usize,
    pub min_participants: usize,
    pub topics: Vec<String>,
}

impl Default for SpontaneousSettings {
    fn default() -> Self {
        let policy = SelectionPolicy::spontaneous();
        Self {
            odds: policy.odds,
            max_participants: policy.max_participants,
            min_participants: policy.min_participants,
            topics: [
                "the weather lately",
                "today's news",
                "a movie worth watching",
                "staying healthy",
                "work",
                "hobbies",
                "a book you read recently",
                "favourite recipes",
                "travel memories",
                "dreams for the future",
                "new technology",
                "music",
                "sports",
                "anime and manga",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl SpontaneousSettings {
    pub fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            odds: self.odds,
            max_participants: self.max_participants,
            min_participants: self.min_participants,
        }
    }
}

/// How many backend calls a cycle makes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationMode {
    /// One call per participant
    #[default]
    PerPersona,
    /// One call writes every participant's turn
    Batch,
}

/// How the generation backend is launched.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationSettings {
    /// Executable name or path of the generation CLI
    pub binary: String,
    pub timeout_secs: u64,
    pub mode: GenerationMode,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            binary: "gemini".to_string(),
            timeout_secs: 30,
            mode: GenerationMode::PerPersona,
        }
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HistorySettings {
    /// Entries a prompt sees
    pub context_window: usize,
    /// Total text size above which the persisted log is halved
    pub max_chars: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_chars: 4000,
        }
    }
}

/// Background conversation between the personas.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AutoChatSettings {
    pub enabled: bool,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Chance that a tick drills into a recurring keyword instead of a random topic
    pub drill_probability: f64,
}

impl Default for AutoChatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 15,
            max_interval_secs: 30,
            drill_probability: 0.3,
        }
    }
}

/// Everything read from `settings.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct MurmurSettings {
    /// Fixes the random source for reproducible runs
    pub seed: Option<u64>,
    pub selection: SelectionPolicy,
    pub spontaneous: SpontaneousSettings,
    pub scheduler: SchedulerConfig,
    pub models: ModelConfig,
    pub generation: GenerationSettings,
    pub history: HistorySettings,
    pub auto_chat: AutoChatSettings,
}

impl MurmurSettings {
    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.selection.validate()?;
        self.spontaneous.policy().validate()?;
        if self.spontaneous.topics.is_empty() {
            return Err(MurmurError::config("spontaneous topics must not be empty"));
        }
        if self.spontaneous.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(MurmurError::config("spontaneous topics must not be empty strings"));
        }
        self.scheduler.validate()?;
        self.models.validate()?;

        if self.generation.binary.trim().is_empty() {
            return Err(MurmurError::config("generation binary must be set"));
        }
        if self.generation.timeout_secs == 0 {
            return Err(MurmurError::config("generation timeout must be at least 1s"));
        }
        if self.history.context_window == 0 {
            return Err(MurmurError::config("history context_window must be at least 1"));
        }

        let auto = &self.auto_chat;
        if auto.min_interval_secs > auto.max_interval_secs {
            return Err(MurmurError::config(format!(
                "auto_chat interval {}..{} is inverted",
                auto.min_interval_secs, auto.max_interval_secs
            )));
        }
        if !(0.0..=1.0).contains(&auto.drill_probability) {
            return Err(MurmurError::config(format!(
                "auto_chat drill_probability {} is outside 0..=1",
                auto.drill_probability
            )));
        }

        Ok(())
    }
}
