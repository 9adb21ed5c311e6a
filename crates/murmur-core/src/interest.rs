//! Interest scoring.
//!
//! Interest is a pure function of (persona, message text): the number of the
//! persona's interest topics that occur in the text, case-insensitively.
//! Overlapping topics (say "art" and "artist") can both match the same word;
//! that is accepted as-is.

use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// Coarse measure of how relevant a message is to a persona.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterestLevel {
    High,
    Medium,
    Low,
}

impl InterestLevel {
    /// Sort rank, lower speaks first.
    pub fn rank(self) -> u8 {
        match self {
            InterestLevel::High => 0,
            InterestLevel::Medium => 1,
            InterestLevel::Low => 2,
        }
    }

    /// Classifies a count of distinct matched topics.
    pub fn from_matches(matches: usize) -> Self {
        match matches {
            0 => InterestLevel::Low,
            1 => InterestLevel::Medium,
            _ => InterestLevel::High,
        }
    }

    /// Display icon used by chat surfaces.
    pub fn icon(self) -> &'static str {
        match self {
            InterestLevel::High => "🔥",
            InterestLevel::Medium => "💭",
            InterestLevel::Low => "😐",
        }
    }
}

/// Scores personas against message text.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterestAnalyzer;

impl InterestAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Returns the interest level of `persona` in `text`.
    pub fn score(&self, persona: &Persona, text: &str) -> InterestLevel {
        InterestLevel::from_matches(self.matched_topics(persona, text).len())
    }

    /// Returns the distinct interest topics of `persona` that occur in `text`.
    pub fn matched_topics<'p>(&self, persona: &'p Persona, text: &str) -> Vec<&'p str> {
        if text.is_empty() {
            return Vec::new();
        }
        let haystack = text.to_lowercase();

        let mut matched: Vec<&str> = Vec::new();
        for topic in &persona.interest_topics {
            if topic.is_empty() || matched.contains(&topic.as_str()) {
                continue;
            }
            if haystack.contains(&topic.to_lowercase()) {
                matched.push(topic);
            }
        }
        matched
    }
}
