//! Read-only persona catalog.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::model::Persona;
use crate::error::{MurmurError, Result};

/// The fixed, non-empty set of personas for the lifetime of the process.
///
/// Roster order is preserved and doubles as the "selection order" every
/// downstream component relies on for tie-breaking.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Arc<[Persona]>,
    by_id: Arc<HashMap<String, usize>>,
}

impl PersonaRegistry {
    /// Builds a registry, validating every persona.
    ///
    /// # Errors
    ///
    /// - `Config` if the roster is empty
    /// - `InvalidPersona` if any record fails validation or an id/name is duplicated
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        if personas.is_empty() {
            return Err(MurmurError::config("persona roster must not be empty"));
        }

        let mut by_id = HashMap::with_capacity(personas.len());
        let mut names = HashSet::with_capacity(personas.len());

        for (index, persona) in personas.iter().enumerate() {
            persona.validate()?;
            if by_id.insert(persona.id.clone(), index).is_some() {
                return Err(MurmurError::invalid_persona(&persona.id, "duplicate id"));
            }
            if !names.insert(persona.name.clone()) {
                return Err(MurmurError::invalid_persona(&persona.name, "duplicate name"));
            }
        }

        tracing::debug!("[Registry] Loaded {} personas", personas.len());

        Ok(Self {
            personas: personas.into(),
            by_id: Arc::new(by_id),
        })
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.by_id.get(id).map(|&index| &self.personas[index])
    }

    /// Looks up a persona by id, failing with `NotFound`.
    pub fn require(&self, id: &str) -> Result<&Persona> {
        self.get(id).ok_or_else(|| MurmurError::not_found("persona", id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    /// Returns the roster position of a persona id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }
}
