use minijinja::Environment;
use serde::{Deserialize, Serialize};

use super::directives::{InterestDirectives, TraitThresholds, temperament_lines, trait_lines};
use super::template::{BATCH_TEMPLATE, BATCH_TEMPLATE_NAME, TURN_TEMPLATE, TURN_TEMPLATE_NAME};
use crate::error::{MurmurError, Result};
use crate::history::ConversationContext;
use crate::interest::InterestLevel;
use crate::persona::Persona;

/// Why a persona is speaking, beyond replying to the last message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Occasion {
    /// Ordinary reply to a user message
    Reply,
    /// Everyone weighs in on a topic
    Discussion { topic: String },
    /// Unprompted remark about a topic
    Spontaneous { topic: String },
    /// Ask another persona about a recurring keyword
    Question { keyword: String, responder: String },
    /// Answer another persona's question
    Answer { asker: String },
}

impl Occasion {
    fn directive(&self) -> Option<String> {
        match self {
            Occasion::Reply => None,
            Occasion::Discussion { topic } => Some(format!(
                "Everyone is discussing \"{topic}\". State your own position on it and react to what the others said."
            )),
            Occasion::Spontaneous { topic } => Some(format!(
                "Nobody asked you anything. Bring up \"{topic}\" on your own, as if it just came to mind."
            )),
            Occasion::Question { keyword, responder } => Some(format!(
                "\"{keyword}\" keeps coming up. Ask {responder} one question that digs deeper into it."
            )),
            Occasion::Answer { asker } => Some(format!(
                "{asker} just asked you the question below. Answer it directly."
            )),
        }
    }

    /// The same situation, addressed to the whole group.
    fn group_directive(&self) -> Option<String> {
        match self {
            Occasion::Discussion { topic } => Some(format!(
                "Everyone is discussing \"{topic}\". Each character states their own position and reacts to the others."
            )),
            Occasion::Spontaneous { topic } => Some(format!(
                "Nobody asked anything. Someone brings up \"{topic}\" as if it just came to mind, and others may join in."
            )),
            other => other.directive(),
        }
    }
}

/// The behavioural instructions a prompt was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDirectives {
    pub temperament: Vec<String>,
    pub traits: Vec<String>,
    pub length: String,
    pub examples: String,
    pub emotion: String,
    pub hidden_traits: Vec<String>,
    pub occasion: Option<String>,
}

/// A self-contained request for one persona's next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub persona_id: String,
    pub interest: InterestLevel,
    /// Model to use instead of the controller's active one, if any
    pub model_hint: Option<String>,
    pub prompt: String,
    pub directives: PromptDirectives,
}

/// One participant of a joint prompt.
#[derive(Debug, Clone, Copy)]
pub struct BatchMember<'a> {
    pub persona: &'a Persona,
    pub interest: InterestLevel,
}

/// Persona id carried by joint requests.
pub const GROUP_REQUEST_ID: &str = "group";

#[derive(Serialize)]
struct ContextLine<'a> {
    speaker: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct PromptView<'a> {
    name: &'a str,
    age: Option<u16>,
    occupation: &'a str,
    personality: &'a str,
    speaking_style: &'a str,
    temperament: &'a str,
    topics: &'a [String],
    backstory: &'a str,
    temperament_lines: &'a [String],
    trait_lines: &'a [String],
    interest: InterestLevel,
    pattern: &'a str,
    length: &'a str,
    examples: &'a str,
    emotion: &'a str,
    hidden_traits: &'a [String],
    context: Vec<ContextLine<'a>>,
    occasion: Option<&'a str>,
    message: &'a str,
}

#[derive(Serialize)]
struct MemberView<'a> {
    name: &'a str,
    age: Option<u16>,
    occupation: &'a str,
    personality: &'a str,
    speaking_style: &'a str,
    temperament: &'a str,
    topics: &'a [String],
    interest: InterestLevel,
    length: &'static str,
    hidden_traits: &'a [String],
}

#[derive(Serialize)]
struct BatchView<'a> {
    members: Vec<MemberView<'a>>,
    context: Vec<ContextLine<'a>>,
    occasion: Option<&'a str>,
    message: &'a str,
}

fn context_lines(context: &ConversationContext) -> Vec<ContextLine<'_>> {
    context
        .entries()
        .iter()
        .map(|e| ContextLine {
            speaker: e.speaker.label(),
            text: &e.text,
        })
        .collect()
}

/// Builds generation prompts from persona traits and conversation state.
///
/// Composition is pure: no I/O, and the same inputs always produce the same
/// prompt.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    env: Environment<'static>,
    thresholds: TraitThresholds,
}

impl PromptComposer {
    pub fn new() -> Result<Self> {
        Self::with_thresholds(TraitThresholds::default())
    }

    pub fn with_thresholds(thresholds: TraitThresholds) -> Result<Self> {
        if thresholds.low > thresholds.high {
            return Err(MurmurError::config(format!(
                "trait threshold low ({}) is above high ({})",
                thresholds.low, thresholds.high
            )));
        }

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TURN_TEMPLATE_NAME, TURN_TEMPLATE)?;
        env.add_template(BATCH_TEMPLATE_NAME, BATCH_TEMPLATE)?;

        Ok(Self { env, thresholds })
    }

    /// Composes a plain reply to `message`.
    pub fn compose(
        &self,
        persona: &Persona,
        message: &str,
        context: &ConversationContext,
        interest: InterestLevel,
    ) -> Result<GenerationRequest> {
        self.compose_for(persona, message, context, interest, &Occasion::Reply)
    }

    /// Composes a turn for a specific occasion.
    ///
    /// Fails when the persona's temperament code is malformed.
    pub fn compose_for(
        &self,
        persona: &Persona,
        message: &str,
        context: &ConversationContext,
        interest: InterestLevel,
        occasion: &Occasion,
    ) -> Result<GenerationRequest> {
        let axes = persona.temperament.parse().map_err(|e| {
            MurmurError::compose(format!("cannot compose for '{}': {}", persona.id, e))
        })?;

        let interest_directives = InterestDirectives::for_level(interest);
        let directives = PromptDirectives {
            temperament: temperament_lines(axes),
            traits: trait_lines(&persona.big_five, self.thresholds),
            length: interest_directives.length.to_string(),
            examples: interest_directives.examples.to_string(),
            emotion: interest_directives.emotion.to_string(),
            hidden_traits: persona.hidden_traits.clone(),
            occasion: occasion.directive(),
        };

        let view = PromptView {
            name: &persona.name,
            age: persona.age,
            occupation: &persona.occupation,
            personality: &persona.personality,
            speaking_style: &persona.speaking_style,
            temperament: persona.temperament.code(),
            topics: &persona.interest_topics,
            backstory: &persona.backstory,
            temperament_lines: &directives.temperament,
            trait_lines: &directives.traits,
            interest,
            pattern: persona.conversation_patterns.for_level(interest),
            length: &directives.length,
            examples: &directives.examples,
            emotion: &directives.emotion,
            hidden_traits: &directives.hidden_traits,
            context: context_lines(context),
            occasion: directives.occasion.as_deref(),
            message,
        };

        let prompt = self.env.get_template(TURN_TEMPLATE_NAME)?.render(&view)?;

        tracing::trace!(
            "[Composer] {} ({}) prompt is {} chars",
            persona.id,
            interest,
            prompt.len()
        );

        Ok(GenerationRequest {
            persona_id: persona.id.clone(),
            interest,
            model_hint: None,
            prompt,
            directives,
        })
    }

    /// Composes one prompt asking for every member's turn at once.
    ///
    /// The reply is expected as `【Name】` blocks; see
    /// [`parse_batch_reply`](super::parse_batch_reply). The request carries
    /// the highest member interest.
    pub fn compose_batch(
        &self,
        members: &[BatchMember<'_>],
        message: &str,
        context: &ConversationContext,
        occasion: &Occasion,
    ) -> Result<GenerationRequest> {
        if members.is_empty() {
            return Err(MurmurError::compose("joint prompt needs at least one member"));
        }

        let mut views = Vec::with_capacity(members.len());
        for member in members {
            let persona = member.persona;
            persona.temperament.parse().map_err(|e| {
                MurmurError::compose(format!("cannot compose for '{}': {}", persona.id, e))
            })?;
            views.push(MemberView {
                name: &persona.name,
                age: persona.age,
                occupation: &persona.occupation,
                personality: &persona.personality,
                speaking_style: &persona.speaking_style,
                temperament: persona.temperament.code(),
                topics: &persona.interest_topics,
                interest: member.interest,
                length: InterestDirectives::for_level(member.interest).length,
                hidden_traits: &persona.hidden_traits,
            });
        }

        let interest = members
            .iter()
            .map(|m| m.interest)
            .min_by_key(|level| level.rank())
            .unwrap_or(InterestLevel::Medium);
        let top = InterestDirectives::for_level(interest);
        let directives = PromptDirectives {
            temperament: Vec::new(),
            traits: Vec::new(),
            length: top.length.to_string(),
            examples: top.examples.to_string(),
            emotion: top.emotion.to_string(),
            hidden_traits: Vec::new(),
            occasion: occasion.group_directive(),
        };

        let view = BatchView {
            members: views,
            context: context_lines(context),
            occasion: directives.occasion.as_deref(),
            message,
        };
        let prompt = self.env.get_template(BATCH_TEMPLATE_NAME)?.render(&view)?;

        tracing::trace!(
            "[Composer] joint prompt for {} members is {} chars",
            members.len(),
            prompt.len()
        );

        Ok(GenerationRequest {
            persona_id: GROUP_REQUEST_ID.to_string(),
            interest,
            model_hint: None,
            prompt,
            directives,
        })
    }
}
