//! GeminiCliService - a GenerationService that wraps the Gemini CLI.
//!
//! Each call spawns the `gemini` command with `--model <id> --prompt <text>`
//! and captures its output. A child that outlives the call's timeout, or whose
//! call is dropped, is killed.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use murmur_core::generation::{GenerationError, GenerationOutcome, GenerationService};
use tokio::process::Command;

/// Generation backend that shells out to the Gemini CLI.
#[derive(Debug, Clone)]
pub struct GeminiCliService {
    /// Executable name (searched in PATH) or path
    binary: String,
    /// Arguments placed before `--model`, e.g. a script for a wrapper interpreter
    leading_args: Vec<String>,
    /// Optional working directory for the child process
    working_dir: Option<PathBuf>,
}

impl GeminiCliService {
    /// Creates a service that runs `binary`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            leading_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Adds arguments that precede the model and prompt flags.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Checks whether the binary can be found in PATH.
    pub async fn is_available(&self) -> bool {
        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        Command::new(check_cmd)
            .arg(&self.binary)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn build_command(&self, prompt: &str, model: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.leading_args)
            .arg("--model")
            .arg(model)
            .arg("--prompt")
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        // GUI launches on macOS start with a minimal PATH.
        #[cfg(target_os = "macos")]
        {
            if let Ok(current_path) = std::env::var("PATH") {
                let home = std::env::var("HOME").unwrap_or_default();
                let mut path = current_path;
                for extra in [
                    "/usr/local/bin".to_string(),
                    "/opt/homebrew/bin".to_string(),
                    format!("{home}/.local/bin"),
                    format!("{home}/.volta/bin"),
                ] {
                    if !path.split(':').any(|p| p == extra) {
                        path = format!("{path}:{extra}");
                    }
                }
                cmd.env("PATH", path);
            }
        }

        cmd
    }
}

impl Default for GeminiCliService {
    fn default() -> Self {
        Self::new("gemini")
    }
}

#[async_trait]
impl GenerationService for GeminiCliService {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<GenerationOutcome, GenerationError> {
        tracing::debug!(
            "[Gemini] Running {} --model {} ({} chars, budget {}s)",
            self.binary,
            model,
            prompt.len(),
            timeout.as_secs()
        );

        let child = self
            .build_command(prompt, model)
            .spawn()
            .map_err(|e| GenerationError::Spawn {
                binary: self.binary.clone(),
                message: e.to_string(),
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!("[Gemini] {} timed out after {}s", model, timeout.as_secs());
                GenerationError::TimedOut(timeout)
            })?
            .map_err(|e| GenerationError::Io(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            let text =
                String::from_utf8(output.stdout).map_err(|e| GenerationError::Utf8(e.to_string()))?;
            tracing::debug!("[Gemini] {} replied with {} chars", model, text.len());
            Ok(GenerationOutcome {
                text: text.trim().to_string(),
                exit_status: Some(0),
                stderr,
            })
        } else {
            tracing::debug!(
                "[Gemini] {} exited with {}: {}",
                model,
                output.status,
                stderr.trim()
            );
            Ok(GenerationOutcome {
                text: String::new(),
                exit_status: output.status.code(),
                stderr,
            })
        }
    }
}
