//! Model fallback controller.
//!
//! Tracks which backend model is active and moves along the configured
//! fallback chain when a call fails transiently (rate limit, quota, unknown
//! model, timeout). A failed model cools down for a while and is skipped when
//! choosing a fallback. Terminal failures never advance the chain.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::ModelConfig;
use crate::error::{MurmurError, Result};
use crate::generation::{GenerationError, GenerationOutcome, GenerationService};
use crate::prompt::GenerationRequest;

/// Why a guarded generation produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackError {
    #[error("all fallback models exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    #[error("model '{model}' failed: {message}")]
    Terminal { model: String, message: String },

    #[error("generation cancelled")]
    Cancelled,
}

/// How a failed attempt is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worth retrying on another model
    Transient,
    /// Surfaced immediately
    Terminal,
}

/// Successful guarded generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    /// Model that produced the text
    pub model: String,
    pub attempts: usize,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub active: String,
    pub primary: String,
    pub error_counts: BTreeMap<String, u32>,
    /// Models that failed within the cooldown window
    pub cooling_down: Vec<String>,
}

#[derive(Debug)]
struct ModelState {
    active: String,
    error_counts: HashMap<String, u32>,
    last_failure: HashMap<String, Instant>,
}

impl ModelState {
    fn in_cooldown(&self, model: &str, cooldown: Duration, now: Instant) -> bool {
        self.last_failure
            .get(model)
            .is_some_and(|at| now.saturating_duration_since(*at) < cooldown)
    }

    fn error_count(&self, model: &str) -> u32 {
        self.error_counts.get(model).copied().unwrap_or(0)
    }

    fn note_failure(&mut self, model: &str, now: Instant) {
        *self.error_counts.entry(model.to_string()).or_insert(0) += 1;
        self.last_failure.insert(model.to_string(), now);
    }
}

/// Owner of the active-model state.
///
/// The state sits behind a `std::sync::Mutex` that is only held for
/// bookkeeping, never across a generation call.
#[derive(Debug)]
pub struct ModelFallbackController {
    config: ModelConfig,
    timeout: Duration,
    state: Mutex<ModelState>,
}

impl ModelFallbackController {
    /// Creates a controller starting on the configured primary model.
    ///
    /// `timeout` bounds each generation attempt.
    pub fn new(config: ModelConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;
        let state = ModelState {
            active: config.primary.clone(),
            error_counts: HashMap::new(),
            last_failure: HashMap::new(),
        };
        Ok(Self {
            config,
            timeout,
            state: Mutex::new(state),
        })
    }

    fn state(&self) -> MutexGuard<'_, ModelState> {
        // Bookkeeping never panics while holding the lock, so a poisoned
        // guard still holds consistent data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn active(&self) -> String {
        self.state().active.clone()
    }

    pub fn primary(&self) -> &str {
        &self.config.primary
    }

    pub fn error_count(&self, model: &str) -> u32 {
        self.state().error_count(model)
    }

    pub fn is_cooling_down(&self, model: &str) -> bool {
        self.state()
            .in_cooldown(model, self.config.cooldown(), Instant::now())
    }

    /// Classifies an error text; with auto-fallback off everything is terminal.
    pub fn classify(&self, error_text: &str) -> FailureKind {
        if self.config.auto_fallback && self.config.is_transient(error_text) {
            FailureKind::Transient
        } else {
            FailureKind::Terminal
        }
    }

    /// Records a transient failure of `model` and switches to its first
    /// fallback that is not cooling down.
    ///
    /// # Returns
    ///
    /// - `Ok(next)`: the new active model
    /// - `Err(FallbackError::Exhausted)`: no eligible fallback; the active
    ///   model is left unchanged
    pub fn record_failure(
        &self,
        model: &str,
        error: &str,
    ) -> std::result::Result<String, FallbackError> {
        let now = Instant::now();
        let cooldown = self.config.cooldown();
        let mut state = self.state();
        state.note_failure(model, now);

        let next = self
            .config
            .chain(model)
            .iter()
            .find(|candidate| !state.in_cooldown(candidate, cooldown, now))
            .cloned();

        match next {
            Some(next) => {
                tracing::warn!(
                    "[Fallback] {} failed ({}), switching to {}",
                    model,
                    error,
                    next
                );
                state.active = next.clone();
                Ok(next)
            }
            None => {
                tracing::error!("[Fallback] {} failed ({}), no fallback available", model, error);
                Err(FallbackError::Exhausted {
                    attempts: 1,
                    last_error: error.to_string(),
                })
            }
        }
    }

    /// Switches the active model by hand.
    pub fn set_active(&self, model: &str) -> Result<()> {
        if !self.config.contains(model) {
            return Err(MurmurError::not_found("model", model));
        }
        let mut state = self.state();
        tracing::info!("[Fallback] Active model set {} -> {}", state.active, model);
        state.active = model.to_string();
        Ok(())
    }

    /// Returns to the primary model. Error counts and cooldowns are kept.
    pub fn reset(&self) {
        let mut state = self.state();
        if state.active != self.config.primary {
            tracing::info!(
                "[Fallback] Reset {} -> {}",
                state.active,
                self.config.primary
            );
        }
        state.active = self.config.primary.clone();
    }

    /// The best model to use right now.
    ///
    /// Lowest priority number among models not cooling down, ties broken by
    /// fewer errors. When every model is cooling down, the lowest priority
    /// number wins regardless.
    pub fn recommended_model(&self) -> String {
        let now = Instant::now();
        let cooldown = self.config.cooldown();
        let state = self.state();

        self.config
            .models
            .iter()
            .filter(|m| !state.in_cooldown(&m.id, cooldown, now))
            .min_by_key(|m| (m.priority, state.error_count(&m.id)))
            .or_else(|| self.config.models.iter().min_by_key(|m| m.priority))
            .map(|m| m.id.clone())
            .unwrap_or_else(|| self.config.primary.clone())
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        let now = Instant::now();
        let cooldown = self.config.cooldown();
        let state = self.state();

        ModelSnapshot {
            active: state.active.clone(),
            primary: self.config.primary.clone(),
            error_counts: state
                .error_counts
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            cooling_down: self
                .config
                .models
                .iter()
                .filter(|m| state.in_cooldown(&m.id, cooldown, now))
                .map(|m| m.id.clone())
                .collect(),
        }
    }

    /// Runs `request` against `service`, falling back on transient failures.
    ///
    /// Starts on the request's model hint, else the active model, and follows
    /// `record_failure` from model to model until one succeeds or no untried
    /// fallback is left. Every model is called at most once per invocation,
    /// so the number of attempts never exceeds the size of the model table.
    /// Each attempt is bounded by the configured timeout; a timeout counts as
    /// transient. A terminal failure is returned at once without advancing the
    /// chain. Success does not reset to the primary.
    pub async fn invoke(
        &self,
        service: &dyn GenerationService,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<Generation, FallbackError> {
        let mut model = request.model_hint.clone().unwrap_or_else(|| self.active());
        let mut tried: HashSet<String> = HashSet::new();

        loop {
            if cancel.is_cancelled() {
                return Err(FallbackError::Cancelled);
            }
            tried.insert(model.clone());
            let attempt = tried.len();

            tracing::debug!(
                "[Fallback] {} attempt {} on {}",
                request.persona_id,
                attempt,
                model
            );

            let call = tokio::time::timeout(
                self.timeout,
                service.generate(&request.prompt, &model, self.timeout),
            );
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("[Fallback] {} cancelled on {}", request.persona_id, model);
                    return Err(FallbackError::Cancelled);
                }
                result = call => result,
            };

            let (message, kind) = match result {
                Ok(Ok(outcome)) if outcome.is_success() => {
                    return Ok(Generation {
                        text: outcome.text.trim().to_string(),
                        model,
                        attempts: attempt,
                    });
                }
                Ok(Ok(outcome)) => {
                    let message = describe_failure(&outcome);
                    let kind = self.classify(&message);
                    (message, kind)
                }
                Ok(Err(GenerationError::TimedOut(after))) => self.timed_out(after),
                Ok(Err(launch)) => (launch.to_string(), FailureKind::Terminal),
                Err(_) => self.timed_out(self.timeout),
            };

            if kind == FailureKind::Terminal {
                self.state().note_failure(&model, Instant::now());
                tracing::warn!("[Fallback] {} terminal failure: {}", model, message);
                return Err(FallbackError::Terminal { model, message });
            }

            match self.record_failure(&model, &message) {
                Ok(next) if !tried.contains(&next) => model = next,
                _ => {
                    tracing::error!(
                        "[Fallback] {} gave up after {} attempts",
                        request.persona_id,
                        attempt
                    );
                    return Err(FallbackError::Exhausted {
                        attempts: attempt,
                        last_error: message,
                    });
                }
            }
        }
    }

    fn timed_out(&self, after: Duration) -> (String, FailureKind) {
        let message = GenerationError::TimedOut(after).to_string();
        let kind = if self.config.auto_fallback {
            FailureKind::Transient
        } else {
            FailureKind::Terminal
        };
        (message, kind)
    }
}

fn describe_failure(outcome: &GenerationOutcome) -> String {
    let status = outcome
        .exit_status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "signal".to_string());
    format!("exit status {}: {}", status, outcome.stderr.trim())
}
