//! Query and interactive session driver.

use super::{ReasoningEngine, Tool};
use crate::display::ObservationFormatter;
use crate::error::ApiError;
use crate::transcript::{LoadStatus, Transcript, TranscriptStore};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

const BANNER_TITLE: &str = "Kube Assistant";
const PROMPT: &str = "Query: ";

pub fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit")
}

pub fn is_continue_command(input: &str) -> bool {
    matches!(
        input.to_lowercase().as_str(),
        "continue" | "continue to iterate" | "continue to iterate?"
    )
}

/// How the interactive loop ended.
enum Ending {
    Command,
    EndOfInput,
    Interrupted,
}

/// One assistant session: an engine, its tool and the operator-facing formatter.
pub struct AssistantSession<W: Write + Send> {
    engine: Box<dyn ReasoningEngine>,
    tool: Box<dyn Tool>,
    formatter: Arc<ObservationFormatter<W>>,
    namespace: Option<String>,
}

impl<W: Write + Send> AssistantSession<W> {
    pub fn new(
        engine: Box<dyn ReasoningEngine>,
        tool: Box<dyn Tool>,
        formatter: Arc<ObservationFormatter<W>>,
    ) -> Self {
        Self {
            engine,
            tool,
            formatter,
            namespace: None,
        }
    }

    /// Default namespace appended to every query as a hint.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    pub fn scoped_query(&self, query: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{} (Use namespace: {})", query, ns),
            None => query.to_string(),
        }
    }

    /// Answer one question without conversational memory and show the answer.
    pub async fn run_query(&self, query: &str) -> Result<String, ApiError> {
        let answer = self.ask(query, &Transcript::new()).await?;
        self.present_answer(&answer);
        Ok(answer)
    }

    async fn ask(&self, query: &str, history: &Transcript) -> Result<String, ApiError> {
        let scoped = self.scoped_query(query);
        info!(query = %scoped, history_turns = history.len(), "Running query");
        self.engine.answer(&scoped, history, self.tool.as_ref()).await
    }

    fn present_answer(&self, answer: &str) {
        if self.formatter.shows_tool_calls() {
            self.formatter.final_answer(answer);
        } else {
            self.formatter.plain(answer);
        }
    }

    /// Run the read-eval loop until `exit`/`quit`, end of input or `interrupt` resolves.
    ///
    /// The transcript is loaded from `store` first and saved after every exchange and
    /// again when the loop ends. Errors from a single turn are printed and the loop
    /// continues.
    pub async fn run_interactive<R, I>(
        &self,
        store: &TranscriptStore,
        mut input: R,
        interrupt: I,
    ) -> Result<(), ApiError>
    where
        R: AsyncBufRead + Unpin,
        I: Future<Output = ()>,
    {
        let mut transcript = self.restore(store);
        self.formatter.banner(
            BANNER_TITLE,
            "Interactive mode started. Type 'exit' or 'quit' to end the session.",
        );

        tokio::pin!(interrupt);
        let ending = loop {
            self.formatter.prompt(PROMPT);
            let mut raw = Vec::new();
            let read = tokio::select! {
                read = input.read_until(b'\n', &mut raw) => read,
                _ = &mut interrupt => break Ending::Interrupted,
            };
            match read {
                Ok(0) => break Ending::EndOfInput,
                Ok(_) => {}
                Err(e) => {
                    self.save(store, &transcript);
                    return Err(ApiError::IoError(e));
                }
            }
            // Undecodable input costs one line, not the session.
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Discarding input line that is not valid UTF-8: {}", e);
                    self.formatter.plain(&format!("Error: input is not valid UTF-8 ({})", e));
                    continue;
                }
            };

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit_command(query) {
                break Ending::Command;
            }
            if is_continue_command(query) {
                self.formatter
                    .notice("Continuing with the previous context...");
                continue;
            }

            let scoped = self.scoped_query(query);
            let outcome = tokio::select! {
                outcome = self.ask(query, &transcript) => outcome,
                _ = &mut interrupt => break Ending::Interrupted,
            };
            match outcome {
                Ok(answer) => {
                    self.present_answer(&answer);
                    transcript.record_exchange(scoped, answer);
                    self.save(store, &transcript);
                }
                Err(e) => self.formatter.plain(&format!("Error: {}", e)),
            }
        };

        self.save(store, &transcript);
        match ending {
            Ending::Interrupted => self.formatter.plain("\nInteractive session ended."),
            Ending::Command | Ending::EndOfInput => {
                self.formatter.banner(BANNER_TITLE, "Interactive session ended.")
            }
        }
        Ok(())
    }

    fn restore(&self, store: &TranscriptStore) -> Transcript {
        let (transcript, status) = store.load_with_status();
        match status {
            LoadStatus::Restored => self.formatter.notice("Memory loaded successfully"),
            LoadStatus::NotFound => {
                self.formatter
                    .notice("No previous memory found. Starting new conversation.");
                // First session: create the stored transcript right away.
                store.persist(&transcript);
            }
            LoadStatus::Discarded(reason) => {
                debug!(reason = %reason, "Stored transcript discarded");
                self.formatter
                    .warning("Warning: Invalid memory format. Creating new memory.");
            }
        }
        transcript
    }

    fn save(&self, store: &TranscriptStore, transcript: &Transcript) {
        match store.save(transcript) {
            Ok(()) => self.formatter.notice("Memory saved successfully"),
            Err(e) => self
                .formatter
                .plain(&format!("Error saving memory: {}", e)),
        }
    }
}
