//! Behavioural directive tables.
//!
//! Pure lookups from persona traits and interest level to the instruction
//! lines the template renders.

use serde::{Deserialize, Serialize};

use crate::interest::InterestLevel;
use crate::persona::{BigFive, TemperamentAxes, TraitAxis};

/// Score bounds outside which a five-factor axis produces a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitThresholds {
    /// Scores strictly above this are "high"
    pub high: u8,
    /// Scores strictly below this are "low"
    pub low: u8,
}

impl Default for TraitThresholds {
    fn default() -> Self {
        Self { high: 70, low: 40 }
    }
}

/// Length, example density and emotional intensity for one interest level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestDirectives {
    pub length: &'static str,
    pub examples: &'static str,
    pub emotion: &'static str,
}

impl InterestDirectives {
    pub fn for_level(level: InterestLevel) -> Self {
        match level {
            InterestLevel::High => Self {
                length: "3-5 sentences, in detail",
                examples: "2-3 concrete examples or personal anecdotes",
                emotion: "passionate and detailed",
            },
            InterestLevel::Medium => Self {
                length: "2-3 sentences",
                examples: "one concrete example",
                emotion: "ordinary interest",
            },
            InterestLevel::Low => Self {
                length: "1-2 sentences, brief",
                examples: "a simple example or none",
                emotion: "reserved and short",
            },
        }
    }
}

/// One line per temperament axis.
pub fn temperament_lines(axes: TemperamentAxes) -> Vec<String> {
    let pick = |yes: bool, a: &str, b: &str| (if yes { a } else { b }).to_string();
    vec![
        pick(
            axes.extraverted,
            "Speak up proactively and keep the energy up",
            "Think before speaking and keep remarks measured",
        ),
        pick(
            axes.sensing,
            "Ground what you say in concrete facts and lived experience",
            "Reach for ideas, possibilities and big-picture connections",
        ),
        pick(
            axes.thinking,
            "Reason things through logically and weigh pros and cons",
            "Lead with empathy and pay attention to how others feel",
        ),
        pick(
            axes.judging,
            "Keep your points organised and work toward a conclusion",
            "Stay flexible and follow tangents as they come up",
        ),
    ]
}

/// Lines for the five-factor axes outside the neutral band.
pub fn trait_lines(big_five: &BigFive, thresholds: TraitThresholds) -> Vec<String> {
    big_five
        .axes()
        .into_iter()
        .filter_map(|(axis, score)| {
            if score > thresholds.high {
                Some(high_trait(axis))
            } else if score < thresholds.low {
                Some(low_trait(axis))
            } else {
                None
            }
        })
        .map(str::to_string)
        .collect()
}

fn high_trait(axis: TraitAxis) -> &'static str {
    match axis {
        TraitAxis::Openness => "Be curious and open to unusual ideas",
        TraitAxis::Conscientiousness => "Be careful, structured and precise",
        TraitAxis::Extraversion => "Be outgoing and talkative",
        TraitAxis::Agreeableness => "Be warm and cooperative toward others",
        TraitAxis::Neuroticism => "Let some worry or sensitivity show",
    }
}

fn low_trait(axis: TraitAxis) -> &'static str {
    match axis {
        TraitAxis::Openness => "Prefer the familiar and the practical",
        TraitAxis::Conscientiousness => "Be relaxed and loose about details",
        TraitAxis::Extraversion => "Be reserved and economical with words",
        TraitAxis::Agreeableness => "Be frank and willing to disagree",
        TraitAxis::Neuroticism => "Stay calm and emotionally steady",
    }
}
