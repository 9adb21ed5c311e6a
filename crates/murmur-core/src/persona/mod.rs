//! Persona domain module.
//!
//! # Module Structure
//!
//! - `model`: the `Persona` record and its trait types
//! - `registry`: the validated, read-only catalog
//! - `repository`: where the roster comes from
//! - `preset`: the built-in roster

mod model;
mod preset;
mod registry;
mod repository;

pub use model::{
    BigFive, ConversationPatterns, Persona, Temperament, TemperamentAxes, TraitAxis,
};
pub use preset::default_roster;
pub use registry::PersonaRegistry;
pub use repository::{PersonaRepository, PresetPersonaRepository};

#[cfg(test)]
pub(crate) use model::fixtures;
