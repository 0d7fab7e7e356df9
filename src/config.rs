//! Configuration System
//!
//! Application configuration layered from defaults, an optional TOML file in the
//! per-user config directory, and `KUBE_ASSISTANT_*` environment overrides. Provider
//! credentials are not kept here; they live in the settings store.

use crate::agent::AgentConfig;
use crate::display::DisplayConfig;
use crate::logging::LoggingConfig;
use crate::runner::RunnerConfig;
use serde::{Deserialize, Serialize};

mod loader;
pub mod paths;

pub use loader::{ConfigLoader, ENV_PREFIX};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// External CLI invocation settings
    pub runner: RunnerConfig,

    /// Tool-call display settings
    pub display: DisplayConfig,

    /// Reasoning loop settings
    pub agent: AgentConfig,
}

impl AssistantConfig {
    /// Validate the entire configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.runner.validate() {
            errors.push(format!("runner: {}", e));
        }
        if let Err(e) = self.agent.validate() {
            errors.push(format!("agent: {}", e));
        }
        if self.display.preview_lines == 0 {
            errors.push("display: preview_lines must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
