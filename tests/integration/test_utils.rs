//! Shared test utilities for integration tests
//!
//! Isolates per-user files behind `KUBE_ASSISTANT_HOME`, provides a scripted stand-in
//! for `kubectl`, and fakes for the chat model and reasoning engine.

use async_trait::async_trait;
use kube_assistant::agent::{ReasoningEngine, Tool};
use kube_assistant::display::{DisplayConfig, ObservationFormatter};
use kube_assistant::error::ApiError;
use kube_assistant::provider::{ChatClient, ChatMessage, CompletionOptions};
use kube_assistant::transcript::Transcript;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

/// Serializes tests that mutate the process environment.
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Environment variables that would leak the developer's setup into a test.
const AMBIENT_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "AZURE_OPENAI_API_KEY",
    "AZURE_OPENAI_ENDPOINT",
    "AZURE_OPENAI_DEPLOYMENT",
    "AZURE_OPENAI_API_VERSION",
    "KUBE_ASSISTANT_LOG",
    "KUBE_ASSISTANT_LOG_FORMAT",
    "KUBE_ASSISTANT_LOG_OUTPUT",
    "KUBE_ASSISTANT_LOG_MODULES",
];

/// Run `f` with `KUBE_ASSISTANT_HOME` pointing at `test_dir`, restoring it afterwards.
pub fn with_assistant_home<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original = std::env::var_os("KUBE_ASSISTANT_HOME");
    std::env::set_var("KUBE_ASSISTANT_HOME", test_dir.path());

    let result = f();

    match original {
        Some(value) => std::env::set_var("KUBE_ASSISTANT_HOME", value),
        None => std::env::remove_var("KUBE_ASSISTANT_HOME"),
    }
    result
}

/// The built binary with an isolated home and no ambient credentials.
pub fn assistant_command(home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kubectl-assistant"));
    command.env("KUBE_ASSISTANT_HOME", home);
    for var in AMBIENT_VARS {
        command.env_remove(var);
    }
    command
}

const FAKE_KUBECTL: &str = r#"#!/bin/sh
case "$*" in
  "get pods")
    printf 'NAME    READY   STATUS    RESTARTS   AGE\nweb-1   1/1     Running   0          5m\n'
    ;;
  "get pod nonexistent")
    echo 'Error from server (NotFound): pods "nonexistent" not found' >&2
    exit 1
    ;;
  "get namespaces -o json")
    printf '{"kind": "List", "items": [{"metadata": {"name": "default"}}]}\n'
    ;;
  *)
    echo "error: unknown command \"$*\"" >&2
    exit 2
    ;;
esac
"#;

static FAKE_KUBECTL_DIR: OnceLock<TempDir> = OnceLock::new();

/// Path to a shell script that answers a few canned kubectl commands.
#[cfg(unix)]
pub fn fake_kubectl() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = FAKE_KUBECTL_DIR.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kubectl");
        std::fs::write(&path, FAKE_KUBECTL).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("kubectl")
}

/// In-memory formatter without colors.
pub fn captured_formatter(show_tool_calls: bool) -> Arc<ObservationFormatter<Vec<u8>>> {
    Arc::new(ObservationFormatter::new(
        Vec::new(),
        DisplayConfig {
            show_tool_calls,
            color: Some(false),
            ..Default::default()
        },
    ))
}

/// Chat client replaying canned model turns and recording every prompt.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<String, ApiError> {
        self.prompts
            .lock()
            .extend(messages.into_iter().map(|m| m.content));
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| ApiError::ProviderError("script exhausted".to_string()))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Engine that runs the query text as a command and answers with the observation.
pub struct CommandEchoEngine {
    pub histories: Arc<Mutex<Vec<usize>>>,
}

impl CommandEchoEngine {
    pub fn new() -> Self {
        Self {
            histories: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ReasoningEngine for CommandEchoEngine {
    async fn answer(
        &self,
        query: &str,
        history: &Transcript,
        tool: &dyn Tool,
    ) -> Result<String, ApiError> {
        self.histories.lock().push(history.len());
        let observation = tool.call(query).await;
        Ok(format!("Observed: {}", observation.trim()))
    }
}
