//! Error types for kubectl-assistant.

use thiserror::Error;

/// Storage-related errors (settings file, transcript blob)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Errors raised before or while spawning the external CLI.
///
/// A command that runs and exits non-zero is not an error; it yields a failed
/// [`CommandResult`](crate::runner::CommandResult).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to parse command '{command}': {reason}")]
    Parse { command: String, reason: String },

    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for {binary}: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level errors surfaced by CLI commands and agent sessions
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error(transparent)]
    RunnerError(#[from] RunnerError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
