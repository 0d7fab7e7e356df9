//! The `kubectl_exec` tool: command execution composed with observation display.

use crate::display::{ObservationFormatter, ParamKey};
use crate::runner::CommandExecutor;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

pub const KUBECTL_TOOL_NAME: &str = "kubectl_exec";

pub const KUBECTL_TOOL_DESCRIPTION: &str = "Execute a kubectl command. Provide the full command without the 'kubectl' prefix. Include namespace with -n or --namespace if needed.";

/// A text-in, text-out capability offered to the reasoning engine.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the tool. Failures come back as observation text, never as errors.
    async fn call(&self, input: &str) -> String;
}

/// Wraps a [`CommandExecutor`] so every call is shown on the formatter.
///
/// This is the only place where execution errors are turned into `Error: ...` text.
pub struct ObservedTool<E, W>
where
    E: CommandExecutor,
    W: Write + Send,
{
    executor: E,
    formatter: Arc<ObservationFormatter<W>>,
}

impl<E, W> ObservedTool<E, W>
where
    E: CommandExecutor,
    W: Write + Send,
{
    pub fn new(executor: E, formatter: Arc<ObservationFormatter<W>>) -> Self {
        Self {
            executor,
            formatter,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

#[async_trait]
impl<E, W> Tool for ObservedTool<E, W>
where
    E: CommandExecutor,
    W: Write + Send,
{
    fn name(&self) -> &str {
        KUBECTL_TOOL_NAME
    }

    fn description(&self) -> &str {
        KUBECTL_TOOL_DESCRIPTION
    }

    async fn call(&self, input: &str) -> String {
        let params = [(ParamKey::Positional(0), input.to_string())];
        let command_line = self.executor.command_line(input);
        self.formatter
            .begin(KUBECTL_TOOL_NAME, &params, command_line.as_deref());

        let observation = match self.executor.execute(input).await {
            Ok(result) if result.succeeded => {
                self.formatter.output(&result.stdout);
                result.observation()
            }
            Ok(result) => {
                info!(exit_code = ?result.exit_code, "Command reported failure");
                self.formatter
                    .error(result.error_text.as_deref().unwrap_or_default());
                result.observation()
            }
            Err(e) => {
                warn!(command = input, "Command could not be executed: {}", e);
                self.formatter.error(&e.to_string());
                format!("Error: {}", e)
            }
        };
        self.formatter.finish();
        observation
    }
}
