//! End-to-end tests against the built `kubectl-assistant` binary.
//!
//! None of these reach a model provider: they cover configuration, history and the
//! paths that fail before a request is made.

use crate::integration::test_utils::assistant_command;
use std::process::Output;
use tempfile::TempDir;

fn run(home: &TempDir, args: &[&str]) -> Output {
    assistant_command(home.path())
        .args(args)
        .output()
        .expect("failed to run kubectl-assistant")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_no_arguments_prints_help() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &[]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Usage:"), "help expected, got: {}", text);
    assert!(text.contains("interactive"));
    assert!(text.contains("history"));
}

#[test]
fn test_set_provider_and_view_redacts_key() {
    let home = TempDir::new().unwrap();

    let set = run(
        &home,
        &[
            "config",
            "--set-provider",
            "azure",
            "--set-azure-key",
            "az-secret-key-7788",
        ],
    );
    assert!(set.status.success(), "stderr: {}", stderr(&set));
    assert_eq!(
        stdout(&set),
        "Provider set to: azure\nAzure OpenAI API key updated\n"
    );

    let view = run(&home, &["config", "--view"]);
    assert!(view.status.success());
    let text = stdout(&view);
    assert!(text.starts_with("Current Configuration:\n"));
    assert!(text.contains("\"provider\": \"azure\""));
    assert!(text.contains("\"api_key\": \"***7788\""));
    assert!(!text.contains("az-secret-key-7788"));
}

#[test]
fn test_config_clear_restores_defaults() {
    let home = TempDir::new().unwrap();
    run(&home, &["config", "--set-openai-model", "gpt-4o-mini"]);

    let clear = run(&home, &["config", "--clear"]);
    assert_eq!(stdout(&clear), "Configuration cleared successfully\n");

    let view = stdout(&run(&home, &["config", "--view"]));
    assert!(view.contains("\"model\": \"gpt-4o\""));
}

#[test]
fn test_invalid_provider_is_rejected() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["config", "--set-provider", "anthropic"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Provider must be 'openai' or 'azure'"));
}

#[test]
fn test_query_without_credentials_fails() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["query", "list", "all", "pods"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains(
        "Error: OpenAI API key is required. Set with --openai-api-key, config command, or OPENAI_API_KEY environment variable."
    ));
}

#[test]
fn test_bare_words_run_as_query() {
    let home = TempDir::new().unwrap();
    run(&home, &["config", "--set-provider", "azure"]);

    let output = run(&home, &["why", "is", "web-1", "pending"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Azure OpenAI API key is required"));
}

#[test]
fn test_history_on_fresh_home() {
    let home = TempDir::new().unwrap();

    let show = run(&home, &["history"]);
    assert!(show.status.success());
    assert_eq!(stdout(&show), "No conversation history stored\n");

    let clear = run(&home, &["history", "--clear"]);
    assert_eq!(stdout(&clear), "No conversation history to clear\n");
}

#[test]
fn test_first_run_creates_settings_file() {
    let home = TempDir::new().unwrap();
    run(&home, &["history"]);

    assert!(home.path().join("settings.json").exists());
}
