//! Prompt composition.

mod batch;
mod composer;
mod directives;
mod template;

pub use batch::{BatchLine, parse_batch_reply};
pub use composer::{
    BatchMember, GROUP_REQUEST_ID, GenerationRequest, Occasion, PromptComposer, PromptDirectives,
};
pub use directives::{InterestDirectives, TraitThresholds};
