//! Agent Shell
//!
//! The boundary between the assistant and its reasoning engine. An engine receives the
//! user's question, the conversation so far and exactly one tool (`kubectl_exec`), and
//! returns a final answer. [`AssistantSession`] drives single queries and the
//! interactive loop and owns the transcript while it runs.

use crate::error::ApiError;
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod react;
mod session;
mod tool;

pub use react::{parse_step, render_history, ReactEngine, Step, ITERATION_LIMIT_ANSWER};
pub use session::{is_continue_command, is_exit_command, AssistantSession};
pub use tool::{ObservedTool, Tool, KUBECTL_TOOL_DESCRIPTION, KUBECTL_TOOL_NAME};

/// Reasoning loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool calls allowed per question before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Sampling temperature sent to the model
    #[serde(default)]
    pub temperature: f32,
}

fn default_max_iterations() -> usize {
    15
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: 0.0,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        Ok(())
    }
}

/// Produces one final answer for a question, calling the tool as often as it needs.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn answer(
        &self,
        query: &str,
        history: &Transcript,
        tool: &dyn Tool,
    ) -> Result<String, ApiError>;
}
