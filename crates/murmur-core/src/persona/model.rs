//! Persona domain model.
//!
//! A persona is a fixed simulated participant. Every field is pure data: the
//! behaviour that depends on it (interest scoring, prompt shaping) lives in the
//! analyzer and composer, never on the persona itself.

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::interest::InterestLevel;

/// Five-factor personality scores, each on a 0-100 scale.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigFive {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

impl BigFive {
    /// Returns each axis paired with its score, in canonical order.
    pub fn axes(&self) -> [(TraitAxis, u8); 5] {
        [
            (TraitAxis::Openness, self.openness),
            (TraitAxis::Conscientiousness, self.conscientiousness),
            (TraitAxis::Extraversion, self.extraversion),
            (TraitAxis::Agreeableness, self.agreeableness),
            (TraitAxis::Neuroticism, self.neuroticism),
        ]
    }
}

impl Default for BigFive {
    fn default() -> Self {
        Self {
            openness: 50,
            conscientiousness: 50,
            extraversion: 50,
            agreeableness: 50,
            neuroticism: 50,
        }
    }
}

/// One of the five-factor axes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraitAxis {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

/// A four-letter temperament code such as `ENFP`.
///
/// Stored as written in configuration; [`Temperament::parse`] checks that each
/// position holds one of its two allowed letters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Temperament(String);

/// The four temperament axes, one per letter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperamentAxes {
    pub extraverted: bool,
    pub sensing: bool,
    pub thinking: bool,
    pub judging: bool,
}

impl Temperament {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Decodes the code into its four axes.
    pub fn parse(&self) -> Result<TemperamentAxes> {
        let letters: Vec<char> = self.0.chars().map(|c| c.to_ascii_uppercase()).collect();
        if letters.len() != 4 {
            return Err(MurmurError::compose(format!(
                "temperament code '{}' must have exactly 4 letters",
                self.0
            )));
        }

        let pick = |c: char, yes: char, no: char| -> Result<bool> {
            match c {
                c if c == yes => Ok(true),
                c if c == no => Ok(false),
                other => Err(MurmurError::compose(format!(
                    "temperament code '{}' has '{}' where {}/{} was expected",
                    self.0, other, yes, no
                ))),
            }
        };

        Ok(TemperamentAxes {
            extraverted: pick(letters[0], 'E', 'I')?,
            sensing: pick(letters[1], 'S', 'N')?,
            thinking: pick(letters[2], 'T', 'F')?,
            judging: pick(letters[3], 'J', 'P')?,
        })
    }
}

/// How a persona tends to talk at each interest level.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationPatterns {
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub low: String,
}

impl ConversationPatterns {
    pub fn for_level(&self, level: InterestLevel) -> &str {
        match level {
            InterestLevel::High => &self.high,
            InterestLevel::Medium => &self.medium,
            InterestLevel::Low => &self.low,
        }
    }
}

/// A configured simulated participant.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Persona {
    /// Stable identifier
    pub id: String,
    /// Display name, also what users type to mention the persona
    pub name: String,
    #[serde(default)]
    pub age: Option<u16>,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub backstory: String,
    pub speaking_style: String,
    pub temperament: Temperament,
    #[serde(default)]
    pub big_five: BigFive,
    /// Topics that raise this persona's interest level
    #[serde(default)]
    pub interest_topics: Vec<String>,
    /// Keyword triggers, used when picking who drills into a recurring keyword
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Base participation probability (0-1)
    #[serde(default = "default_participation_probability")]
    pub participation_probability: f64,
    /// Traits the persona expresses subtly rather than openly
    #[serde(default)]
    pub hidden_traits: Vec<String>,
    /// Display colour (e.g. "#FF69B4"); ignored by the core
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub conversation_patterns: ConversationPatterns,
}

fn default_participation_probability() -> f64 {
    0.5
}

impl Persona {
    /// Checks the record for the malformed input the composer cannot recover from.
    pub fn validate(&self) -> Result<()> {
        let label = if self.name.is_empty() { &self.id } else { &self.name };

        if self.id.trim().is_empty() {
            return Err(MurmurError::invalid_persona(label, "id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(MurmurError::invalid_persona(label, "name must not be empty"));
        }

        self.temperament
            .parse()
            .map_err(|e| MurmurError::invalid_persona(label, e.to_string()))?;

        for (axis, score) in self.big_five.axes() {
            if score > 100 {
                return Err(MurmurError::invalid_persona(
                    label,
                    format!("{axis} score {score} exceeds 100"),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.participation_probability) {
            return Err(MurmurError::invalid_persona(
                label,
                format!(
                    "participation probability {} is outside 0..=1",
                    self.participation_probability
                ),
            ));
        }

        if self.interest_topics.iter().any(|t| t.trim().is_empty()) {
            return Err(MurmurError::invalid_persona(label, "empty interest topic"));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(MurmurError::invalid_persona(label, "empty keyword"));
        }

        Ok(())
    }

    /// True when `message` addresses this persona by name or `@name`.
    pub fn is_mentioned_in(&self, message: &str) -> bool {
        message.contains(&self.name) || message.contains(&format!("@{}", self.name))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn persona(id: &str, topics: &[&str]) -> Persona {
        Persona {
            id: id.to_string(),
            name: id.to_string(),
            age: Some(30),
            occupation: "Tester".to_string(),
            personality: "Curious".to_string(),
            backstory: "Grew up writing test fixtures".to_string(),
            speaking_style: "Plain".to_string(),
            temperament: Temperament::new("ENFP"),
            big_five: BigFive::default(),
            interest_topics: topics.iter().map(|t| t.to_string()).collect(),
            keywords: Vec::new(),
            participation_probability: 0.5,
            hidden_traits: Vec::new(),
            color: None,
            conversation_patterns: ConversationPatterns {
                high: "eager".to_string(),
                medium: "polite".to_string(),
                low: "terse".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::persona;
    use super::*;

    #[test]
    fn test_temperament_parse() {
        let axes = Temperament::new("INTJ").parse().unwrap();
        assert!(!axes.extraverted);
        assert!(!axes.sensing);
        assert!(axes.thinking);
        assert!(axes.judging);

        let axes = Temperament::new("esfp").parse().unwrap();
        assert!(axes.extraverted && axes.sensing && !axes.thinking && !axes.judging);
    }

    #[test]
    fn test_temperament_rejects_bad_codes() {
        assert!(Temperament::new("ENF").parse().is_err());
        assert!(Temperament::new("XNFP").parse().is_err());
        assert!(Temperament::new("ENFPX").parse().is_err());
    }

    #[test]
    fn test_validate_accepts_fixture() {
        assert!(persona("alice", &["cooking"]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut p = persona("alice", &[]);
        p.big_five.openness = 101;
        assert!(matches!(p.validate(), Err(MurmurError::InvalidPersona { .. })));

        let mut p = persona("alice", &[]);
        p.participation_probability = 1.5;
        assert!(p.validate().is_err());

        let mut p = persona("alice", &[" "]);
        p.interest_topics.push("music".to_string());
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_mention_detection() {
        let p = persona("Rina", &[]);
        assert!(p.is_mentioned_in("what do you think, Rina?"));
        assert!(p.is_mentioned_in("@Rina hi"));
        assert!(!p.is_mentioned_in("rina lowercase is not a mention"));
    }
}
