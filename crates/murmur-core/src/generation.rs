//! The text-generation backend abstraction.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// What the backend produced for one call.
///
/// A call that ran to completion is reported here even if it failed; the
/// fallback controller decides what a non-zero exit means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    /// Process exit code; `None` when the process was killed by a signal
    pub exit_status: Option<i32>,
    pub stderr: String,
}

impl GenerationOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_status: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_status: i32, stderr: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            exit_status: Some(exit_status),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// The backend could not be run at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("failed to launch '{binary}': {message}")]
    Spawn { binary: String, message: String },

    #[error("I/O error while generating: {0}")]
    Io(String),

    #[error("backend output is not valid UTF-8: {0}")]
    Utf8(String),

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
}

/// A shared, rate-limited text generator.
///
/// Implementations must tolerate being dropped mid-call: the caller enforces
/// timeouts and cancellation by dropping the future.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generates a reply for `prompt` using `model`.
    ///
    /// # Arguments
    ///
    /// * `prompt` - The composed prompt
    /// * `model` - Backend model identifier
    /// * `timeout` - Upper bound the backend may apply to the call itself
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<GenerationOutcome, GenerationError>;
}
