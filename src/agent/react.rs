//! Text ReAct loop over a chat-completion model.
//!
//! The model sees a prompt listing the tool, the chat history and the question, and
//! answers in `Thought / Action / Action Input` steps. Each action is executed and its
//! observation appended to the scratchpad until the model emits `Final Answer:`.

use super::{AgentConfig, ReasoningEngine, Tool};
use crate::error::ApiError;
use crate::provider::{ChatClient, ChatMessage, CompletionOptions};
use crate::transcript::{Transcript, Turn};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Answer returned when the model never reaches a final answer.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit.";

const STOP_SEQUENCE: &str = "\nObservation:";
const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";
const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// One parsed model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Action { tool: String, input: String },
    Finish(String),
    /// Output that fits neither shape; the reason is fed back to the model
    Invalid(String),
}

/// Parse a model turn into an action, a final answer, or a format complaint.
pub fn parse_step(output: &str) -> Step {
    let action = output.find(ACTION_MARKER).map(|start| {
        let rest = &output[start + ACTION_MARKER.len()..];
        let name = rest.lines().next().unwrap_or_default().trim().to_string();
        let input = rest.find(ACTION_INPUT_MARKER).map(|at| {
            let raw = &rest[at + ACTION_INPUT_MARKER.len()..];
            let raw = raw.split(STOP_SEQUENCE).next().unwrap_or_default();
            clean_input(raw)
        });
        (name, input)
    });
    let final_answer = output
        .find(FINAL_ANSWER_MARKER)
        .map(|start| output[start + FINAL_ANSWER_MARKER.len()..].trim().to_string());

    match (action, final_answer) {
        (Some((_, Some(_))), Some(_)) => Step::Invalid(
            "Parsing LLM output produced both a final answer and a parse-able action".to_string(),
        ),
        (Some((tool, Some(input))), None) if !tool.is_empty() => Step::Action { tool, input },
        (Some((_, Some(_))), None) => Step::Invalid("Missing tool name after 'Action:'".to_string()),
        (_, Some(answer)) => Step::Finish(answer),
        (Some((_, None)), None) => {
            Step::Invalid("Missing 'Action Input:' after 'Action:'".to_string())
        }
        (None, None) => Step::Invalid("Missing 'Action:' after 'Thought:'".to_string()),
    }
}

/// Trim whitespace, then one pair of surrounding quotes or backticks.
fn clean_input(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\'', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Chat history as `Human:` / `AI:` lines.
pub fn render_history(history: &Transcript) -> String {
    history
        .iter()
        .map(|turn| match turn {
            Turn::Human(text) => format!("Human: {}", text),
            Turn::Assistant(text) => format!("AI: {}", text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_prompt(query: &str, history: &Transcript, tool: &dyn Tool) -> String {
    let mut prompt = String::from(
        "You are a Kubernetes troubleshooting assistant.\n\
         You help users diagnose and fix issues with their Kubernetes clusters.\n\n",
    );
    if !history.is_empty() {
        prompt.push_str("Chat History:\n");
        prompt.push_str(&render_history(history));
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("{}: {}\n\n", tool.name(), tool.description()));
    prompt.push_str(
        "When using kubectl commands, always consider the appropriate namespace. \
         If a namespace is specified in the user's query, use that namespace.\n\n\
         Use the following format:\n\n\
         Question: the user's question\n\
         Thought: consider what to do\n",
    );
    prompt.push_str(&format!(
        "Action: the action to take, should be one of [{}]\n",
        tool.name()
    ));
    prompt.push_str(
        "Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original user question\n\n\
         Begin!\n\n",
    );
    prompt.push_str(&format!("Question: {}\nThought:", query));
    prompt
}

/// [`ReasoningEngine`] that runs the ReAct format against a [`ChatClient`].
pub struct ReactEngine {
    client: Box<dyn ChatClient>,
    config: AgentConfig,
}

impl ReactEngine {
    pub fn new(client: Box<dyn ChatClient>, config: AgentConfig) -> Self {
        Self { client, config }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: None,
            stop: Some(vec![STOP_SEQUENCE.to_string()]),
        }
    }
}

#[async_trait]
impl ReasoningEngine for ReactEngine {
    async fn answer(
        &self,
        query: &str,
        history: &Transcript,
        tool: &dyn Tool,
    ) -> Result<String, ApiError> {
        let prompt = render_prompt(query, history, tool);
        let mut scratchpad = String::new();
        info!(
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            "Answering query"
        );

        for iteration in 1..=self.config.max_iterations {
            let messages = vec![ChatMessage::user(format!("{}{}", prompt, scratchpad))];
            let output = self.client.complete(messages, self.options()).await?;
            debug!(iteration, "Model step: {}", output.trim());

            let observation = match parse_step(&output) {
                Step::Finish(answer) => return Ok(answer),
                Step::Action { tool: name, input } if name == tool.name() => {
                    tool.call(&input).await
                }
                Step::Action { tool: name, .. } => format!(
                    "{} is not a valid tool, try one of [{}].",
                    name,
                    tool.name()
                ),
                Step::Invalid(reason) => {
                    warn!(iteration, "Unparseable model output: {}", reason);
                    format!("Invalid Format: {}", reason)
                }
            };

            scratchpad.push(' ');
            scratchpad.push_str(output.trim());
            scratchpad.push_str(&format!("\nObservation: {}\nThought:", observation.trim_end()));
        }

        warn!(
            limit = self.config.max_iterations,
            "Reasoning loop hit the iteration limit"
        );
        Ok(ITERATION_LIMIT_ANSWER.to_string())
    }
}
