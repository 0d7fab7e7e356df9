//! Command Runner
//!
//! Executes one cluster-management command line as a child process. The raw text is
//! split with POSIX shell-word rules and passed as an argument vector, so no shell ever
//! interprets it. A non-zero exit is a normal, displayable result rather than an error.

use crate::error::RunnerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// External CLI invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Binary prepended to every command line
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Per-command time limit in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_binary() -> String {
    "kubectl".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        let binary = self.binary.trim();
        if binary.is_empty() {
            return Err("binary cannot be empty".to_string());
        }
        if binary.contains(char::is_whitespace) {
            return Err(format!("binary '{}' must be a single program name", binary));
        }
        Ok(())
    }
}

/// Outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub succeeded: bool,
    /// Captured stderr (or a synthesized reason) when the command failed
    pub error_text: Option<String>,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn success(stdout: String) -> Self {
        Self {
            stdout,
            succeeded: true,
            error_text: None,
            exit_code: Some(0),
        }
    }

    pub fn failure(stdout: String, error_text: String, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            succeeded: false,
            error_text: Some(error_text),
            exit_code,
        }
    }

    /// Text handed to the reasoning engine for this result.
    pub fn observation(&self) -> String {
        if self.succeeded {
            self.stdout.clone()
        } else {
            format!("Error: {}", self.error_text.as_deref().unwrap_or_default())
        }
    }
}

/// Something that can execute a raw command line. The display adapter wraps this.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, raw_command: &str) -> Result<CommandResult, RunnerError>;

    /// Fully normalized command line for display, if the input is well formed.
    fn command_line(&self, _raw_command: &str) -> Option<String> {
        None
    }
}

/// Split `raw` into an argument vector with `binary` as the first element exactly once.
pub fn normalize_command(raw: &str, binary: &str) -> Result<Vec<String>, RunnerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RunnerError::EmptyCommand);
    }

    let mut argv = shell_words::split(trimmed).map_err(|e| RunnerError::Parse {
        command: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if argv.is_empty() {
        return Err(RunnerError::EmptyCommand);
    }

    if argv[0] != binary {
        argv.insert(0, binary.to_string());
    }
    Ok(argv)
}

/// Runs commands against a fixed binary (normally `kubectl`).
#[derive(Debug, Clone)]
pub struct CommandRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.binary.trim(), config.timeout())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl CommandExecutor for CommandRunner {
    async fn execute(&self, raw_command: &str) -> Result<CommandResult, RunnerError> {
        let argv = normalize_command(raw_command, &self.binary)?;
        debug!(command = %shell_words::join(&argv), "Executing command");

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    warn!(binary = %self.binary, limit_secs = limit.as_secs_f64(), "Command timed out");
                    return Ok(CommandResult::failure(
                        String::new(),
                        format!("command timed out after {:?}", limit),
                        None,
                    ));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| RunnerError::Wait {
            binary: self.binary.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(CommandResult::success(stdout));
        }

        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if stderr.trim().is_empty() {
            stderr = format!("{} exited with {}", self.binary, output.status);
        }
        debug!(exit_code = ?output.status.code(), "Command failed");
        Ok(CommandResult::failure(stdout, stderr, output.status.code()))
    }

    fn command_line(&self, raw_command: &str) -> Option<String> {
        normalize_command(raw_command, &self.binary)
            .ok()
            .map(|argv| shell_words::join(argv))
    }
}
