//! Participant selection.
//!
//! Decides which personas speak in a turn:
//!
//! 1. **Mentions**: personas addressed by name (or `@name`) are always included
//!    and never dropped by capping.
//! 2. **Sampling**: every other persona joins with a probability that depends
//!    on its interest level in the message.
//! 3. **Capping**: if the union exceeds the cap, mentions are kept, then High
//!    picks, then Medium picks, in selection order. Low picks are dropped
//!    whenever capping applies.
//!
//! The result may exceed `max_participants` only when mentions alone exceed it.

use rand::Rng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::interest::{InterestAnalyzer, InterestLevel};
use crate::persona::Persona;

/// Participation probability per interest level.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ParticipationOdds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl ParticipationOdds {
    /// Odds used for spontaneous, unprompted chatter.
    pub fn spontaneous() -> Self {
        Self {
            high: 0.6,
            medium: 0.3,
            low: 0.1,
        }
    }

    pub fn for_level(&self, level: InterestLevel) -> f64 {
        match level {
            InterestLevel::High => self.high,
            InterestLevel::Medium => self.medium,
            InterestLevel::Low => self.low,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, p) in [("high", self.high), ("medium", self.medium), ("low", self.low)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(MurmurError::config(format!(
                    "participation odds '{name}' = {p} is outside 0..=1"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ParticipationOdds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.4,
            low: 0.1,
        }
    }
}

/// Tunables for one kind of selection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SelectionPolicy {
    pub odds: ParticipationOdds,
    pub max_participants: usize,
    /// When fewer participants were drawn, random personas are added at
    /// Medium interest until this many take part.
    pub min_participants: usize,
}

impl SelectionPolicy {
    /// Policy for spontaneous topics: gentler odds, at most three, at least one.
    pub fn spontaneous() -> Self {
        Self {
            odds: ParticipationOdds::spontaneous(),
            max_participants: 3,
            min_participants: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.odds.validate()?;
        if self.max_participants == 0 {
            return Err(MurmurError::config("max_participants must be at least 1"));
        }
        if self.min_participants > self.max_participants {
            return Err(MurmurError::config(format!(
                "min_participants ({}) exceeds max_participants ({})",
                self.min_participants, self.max_participants
            )));
        }
        Ok(())
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            odds: ParticipationOdds::default(),
            max_participants: 5,
            min_participants: 0,
        }
    }
}

/// A persona chosen to speak, with the interest level it was chosen at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub persona_id: String,
    pub interest: InterestLevel,
    pub mentioned: bool,
}

/// Picks the participants of a turn.
#[derive(Debug, Default, Clone)]
pub struct PersonaSelector {
    analyzer: InterestAnalyzer,
}

impl PersonaSelector {
    pub fn new(analyzer: InterestAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Returns the personas addressed in `message`, in roster order.
    pub fn mentioned<'p>(&self, personas: &'p [Persona], message: &str) -> Vec<&'p Persona> {
        personas
            .iter()
            .filter(|p| p.is_mentioned_in(message))
            .collect()
    }

    /// Selects the participants for `message`.
    ///
    /// Mentioned personas come first, followed by sampled ones in roster order.
    /// The random source is injected so a seeded generator gives reproducible
    /// selections.
    pub fn select<R: Rng + ?Sized>(
        &self,
        personas: &[Persona],
        message: &str,
        policy: &SelectionPolicy,
        rng: &mut R,
    ) -> Vec<Participant> {
        let mut mentioned = Vec::new();
        let mut sampled = Vec::new();

        for persona in personas {
            let interest = self.analyzer.score(persona, message);

            if persona.is_mentioned_in(message) {
                tracing::debug!("[Selector] {} mentioned ({})", persona.name, interest);
                mentioned.push(Participant {
                    persona_id: persona.id.clone(),
                    interest,
                    mentioned: true,
                });
                continue;
            }

            let roll: f64 = rng.r#gen();
            let odds = policy.odds.for_level(interest);
            let joins = roll < odds;
            tracing::debug!(
                "[Selector] {} interest={} roll={:.3} odds={:.2} joins={}",
                persona.name,
                interest,
                roll,
                odds,
                joins
            );
            if joins {
                sampled.push(Participant {
                    persona_id: persona.id.clone(),
                    interest,
                    mentioned: false,
                });
            }
        }

        let mut selected = if mentioned.len() + sampled.len() > policy.max_participants {
            Self::cap(mentioned, sampled, policy.max_participants)
        } else {
            mentioned.into_iter().chain(sampled).collect()
        };

        while selected.len() < policy.min_participants {
            let Some(extra) = personas
                .iter()
                .filter(|p| !selected.iter().any(|s| s.persona_id == p.id))
                .choose(rng)
            else {
                break;
            };
            tracing::debug!("[Selector] {} drafted to reach the minimum", extra.name);
            selected.push(Participant {
                persona_id: extra.id.clone(),
                interest: InterestLevel::Medium,
                mentioned: false,
            });
        }

        selected
    }

    fn cap(
        mentioned: Vec<Participant>,
        sampled: Vec<Participant>,
        max_participants: usize,
    ) -> Vec<Participant> {
        let mut selected = mentioned;
        let mut remaining = max_participants.saturating_sub(selected.len());

        for level in [InterestLevel::High, InterestLevel::Medium] {
            for participant in sampled.iter().filter(|p| p.interest == level) {
                if remaining == 0 {
                    break;
                }
                selected.push(participant.clone());
                remaining -= 1;
            }
        }

        tracing::debug!(
            "[Selector] Capped {} candidates to {}",
            selected.len() + sampled.len(),
            selected.len()
        );
        selected
    }
}
