//! Command execution through the observed tool and the reasoning loop, against a
//! scripted kubectl stand-in.

#![cfg(unix)]

use crate::integration::test_utils::{captured_formatter, fake_kubectl, ScriptedClient};
use kube_assistant::agent::{AgentConfig, ObservedTool, ReactEngine, ReasoningEngine, Tool};
use kube_assistant::error::RunnerError;
use kube_assistant::runner::{CommandExecutor, CommandRunner};
use kube_assistant::transcript::Transcript;
use std::sync::Arc;
use std::time::Duration;

fn runner() -> CommandRunner {
    CommandRunner::new(
        fake_kubectl().to_string_lossy().into_owned(),
        Some(Duration::from_secs(30)),
    )
}

#[tokio::test]
async fn test_successful_command_returns_stdout() {
    let result = runner().execute("get pods").await.unwrap();

    assert!(result.succeeded);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.stdout.starts_with("NAME    READY"));
    assert!(result.stdout.contains("web-1"));
    assert_eq!(result.observation(), result.stdout);
}

#[tokio::test]
async fn test_failed_command_is_a_result_not_an_error() {
    let result = runner().execute("get pod nonexistent").await.unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.exit_code, Some(1));
    assert!(result
        .observation()
        .starts_with("Error: Error from server (NotFound)"));
}

#[tokio::test]
async fn test_binary_name_is_not_duplicated() {
    let binary = fake_kubectl().to_string_lossy().into_owned();
    let runner = runner();

    let with_prefix = runner
        .execute(&format!("{} get pods", binary))
        .await
        .unwrap();
    assert!(with_prefix.succeeded, "prefixed command should still match");
}

#[tokio::test]
async fn test_shell_metacharacters_are_not_interpreted() {
    let result = runner().execute("get pods; echo injected").await.unwrap();

    // The fake binary sees four literal arguments and rejects them.
    assert!(!result.succeeded);
    assert!(!result.stdout.contains("injected"));
}

#[tokio::test]
async fn test_empty_and_malformed_commands_error() {
    let runner = runner();
    assert!(matches!(
        runner.execute("   ").await,
        Err(RunnerError::EmptyCommand)
    ));
    assert!(matches!(
        runner.execute("get pods -l 'app=web").await,
        Err(RunnerError::Parse { .. })
    ));
}

#[tokio::test]
async fn test_missing_binary_is_reported() {
    let runner = CommandRunner::new("/nonexistent/kubectl-for-tests", None);
    let err = runner.execute("get pods").await.unwrap_err();
    assert!(matches!(err, RunnerError::Spawn { .. }));
}

#[tokio::test]
async fn test_observed_tool_shows_plain_output() {
    let formatter = captured_formatter(true);
    let tool = ObservedTool::new(runner(), Arc::clone(&formatter));

    let observation = tool.call("get pods").await;

    assert!(observation.contains("web-1"));
    let shown = formatter.captured();
    assert!(shown.contains("EXECUTING: kubectl_exec"));
    assert!(shown.contains("get pods"));
    assert!(shown.contains("Output:"));
    assert!(shown.contains("web-1   1/1     Running"));
}

#[tokio::test]
async fn test_observed_tool_numbers_json_output() {
    let formatter = captured_formatter(true);
    let tool = ObservedTool::new(runner(), Arc::clone(&formatter));

    let observation = tool.call("get namespaces -o json").await;

    assert!(observation.contains("\"default\""));
    let shown = formatter.captured();
    assert!(shown.contains("1 │ {"), "json should be line numbered: {}", shown);
    assert!(shown.contains("\"kind\": \"List\""));
}

#[tokio::test]
async fn test_observed_tool_hidden_display_still_returns_observation() {
    let formatter = captured_formatter(false);
    let tool = ObservedTool::new(runner(), Arc::clone(&formatter));

    let observation = tool.call("get pod nonexistent").await;

    assert!(observation.starts_with("Error: "));
    assert!(formatter.captured().is_empty());
}

#[tokio::test]
async fn test_engine_observes_failure_and_answers() {
    let client = ScriptedClient::new(&[
        "I should look up the pod.\nAction: kubectl_exec\nAction Input: get pod nonexistent",
        "The pod is missing.\nFinal Answer: The pod nonexistent does not exist.",
    ]);
    let prompts = Arc::clone(&client.prompts);
    let engine = ReactEngine::new(Box::new(client), AgentConfig::default());

    let formatter = captured_formatter(true);
    let tool = ObservedTool::new(runner(), Arc::clone(&formatter));

    let answer = engine
        .answer("Is pod nonexistent running?", &Transcript::new(), &tool)
        .await
        .unwrap();

    assert_eq!(answer, "The pod nonexistent does not exist.");

    let second_prompt = prompts.lock().last().cloned().unwrap();
    assert!(second_prompt.contains("Observation: Error: Error from server (NotFound)"));

    let shown = formatter.captured();
    assert!(shown.contains("Error:\nError from server (NotFound)"));
}
