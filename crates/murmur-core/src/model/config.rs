//! Model table configuration.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};

/// One backend model and where to go when it fails.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// Lower is preferred
    pub priority: u32,
    /// Models to try, in order, after a transient failure on this one
    #[serde(default)]
    pub fallback_chain: Vec<String>,
}

impl ModelSpec {
    pub fn new(id: &str, display_name: &str, priority: u32, fallback_chain: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            priority,
            fallback_chain: fallback_chain.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Model set, fallback chains and failure classification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model that is active at start and after a reset
    pub primary: String,
    #[serde(rename = "model")]
    pub models: Vec<ModelSpec>,
    /// How long a failed model is skipped when choosing a fallback
    pub cooldown_secs: u64,
    /// Case-insensitive substrings that mark an error as transient
    pub transient_indicators: Vec<String>,
    /// When false, transient failures are surfaced instead of advancing the chain
    pub auto_fallback: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary: "gemini-2.5-pro".to_string(),
            models: vec![
                ModelSpec::new(
                    "gemini-2.5-pro",
                    "Gemini 2.5 Pro",
                    1,
                    &["gemini-2.5-flash", "gemini-1.5-flash"],
                ),
                ModelSpec::new(
                    "gemini-2.5-flash",
                    "Gemini 2.5 Flash",
                    2,
                    &["gemini-1.5-flash"],
                ),
                ModelSpec::new(
                    "gemini-1.5-flash",
                    "Gemini 1.5 Flash",
                    3,
                    &["gemini-1.5-pro"],
                ),
                ModelSpec::new(
                    "gemini-1.5-pro",
                    "Gemini 1.5 Pro",
                    4,
                    &["gemini-2.5-flash", "gemini-1.5-flash"],
                ),
            ],
            cooldown_secs: 300,
            transient_indicators: [
                "429",
                "Too Many Requests",
                "quota",
                "RESOURCE_EXHAUSTED",
                "404",
                "not found",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            auto_fallback: true,
        }
    }
}

impl ModelConfig {
    pub fn get(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The fallback chain of `id`, empty for unknown models.
    pub fn chain(&self, id: &str) -> &[String] {
        self.get(id).map(|m| m.fallback_chain.as_slice()).unwrap_or(&[])
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// True when `error_text` contains any transient indicator.
    pub fn is_transient(&self, error_text: &str) -> bool {
        let haystack = error_text.to_lowercase();
        self.transient_indicators
            .iter()
            .any(|needle| haystack.contains(&needle.to_lowercase()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(MurmurError::config("model table is empty"));
        }

        let mut seen = HashSet::new();
        for spec in &self.models {
            if !seen.insert(spec.id.as_str()) {
                return Err(MurmurError::config(format!(
                    "model '{}' is listed twice",
                    spec.id
                )));
            }
        }

        if !self.contains(&self.primary) {
            return Err(MurmurError::config(format!(
                "primary model '{}' is not in the model table",
                self.primary
            )));
        }

        for spec in &self.models {
            for next in &spec.fallback_chain {
                if !self.contains(next) {
                    return Err(MurmurError::config(format!(
                        "fallback '{}' of model '{}' is not in the model table",
                        next, spec.id
                    )));
                }
            }
        }

        Ok(())
    }
}
