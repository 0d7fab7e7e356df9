//! CLI parse: clap types for kubectl-assistant. No behavior; definitions only.

use crate::provider::{ProviderKind, ProviderOverrides};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Subcommand names recognised before implicit-query rewriting.
pub const KNOWN_COMMANDS: &[&str] = &["config", "query", "interactive", "history", "help"];

/// kubectl assistant - natural-language troubleshooting for Kubernetes clusters
#[derive(Parser, Debug)]
#[command(name = "kubectl assistant", bin_name = "kubectl assistant", version)]
#[command(about = "A kubectl plugin for assisting with Kubernetes cluster management")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure kubectl assistant settings
    Config(ConfigArgs),
    /// Run a query
    Query {
        /// Natural language query describing the issue or request
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        #[command(flatten)]
        session: SessionArgs,
    },
    /// Start an interactive session
    Interactive {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Show or clear the stored conversation history
    History {
        /// Print the stored conversation
        #[arg(long)]
        show: bool,

        /// Delete the stored conversation
        #[arg(long, conflicts_with = "show")]
        clear: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// View current configuration
    #[arg(long)]
    pub view: bool,

    /// Clear all configuration
    #[arg(long)]
    pub clear: bool,

    /// Set the default provider (openai, azure)
    #[arg(long, value_name = "PROVIDER")]
    pub set_provider: Option<ProviderKind>,

    /// Set OpenAI API key
    #[arg(long, value_name = "KEY")]
    pub set_openai_key: Option<String>,

    /// Set OpenAI model
    #[arg(long, value_name = "MODEL")]
    pub set_openai_model: Option<String>,

    /// Set Azure OpenAI API key
    #[arg(long, value_name = "KEY")]
    pub set_azure_key: Option<String>,

    /// Set Azure OpenAI endpoint URL
    #[arg(long, value_name = "URL")]
    pub set_azure_endpoint: Option<String>,

    /// Set Azure OpenAI deployment name
    #[arg(long, value_name = "NAME")]
    pub set_azure_deployment: Option<String>,

    /// Set Azure OpenAI API version
    #[arg(long, value_name = "VERSION")]
    pub set_azure_version: Option<String>,
}

/// Options shared by `query` and `interactive`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Default Kubernetes namespace to use (if not specified, will be determined by the AI)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable the rich display of tool calls and their results
    #[arg(long)]
    pub no_tool_display: bool,

    /// LLM provider to use (openai, azure; overrides config file setting)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<ProviderKind>,

    /// OpenAI model to use (overrides config file setting)
    #[arg(long, help_heading = "OpenAI options")]
    pub model: Option<String>,

    /// OpenAI API key (overrides config file setting)
    #[arg(long, help_heading = "OpenAI options")]
    pub openai_api_key: Option<String>,

    /// Azure OpenAI API key (overrides config file setting)
    #[arg(long, help_heading = "Azure OpenAI options")]
    pub azure_api_key: Option<String>,

    /// Azure OpenAI endpoint URL (overrides config file setting)
    #[arg(long, help_heading = "Azure OpenAI options")]
    pub azure_endpoint: Option<String>,

    /// Azure OpenAI deployment name (overrides config file setting)
    #[arg(long, help_heading = "Azure OpenAI options")]
    pub azure_deployment: Option<String>,

    /// Azure OpenAI API version (overrides config file setting)
    #[arg(long, help_heading = "Azure OpenAI options")]
    pub azure_api_version: Option<String>,
}

impl SessionArgs {
    pub fn overrides(&self) -> ProviderOverrides {
        ProviderOverrides {
            provider: self.provider,
            model: self.model.clone(),
            openai_api_key: self.openai_api_key.clone(),
            azure_api_key: self.azure_api_key.clone(),
            azure_endpoint: self.azure_endpoint.clone(),
            azure_deployment: self.azure_deployment.clone(),
            azure_api_version: self.azure_api_version.clone(),
        }
    }
}

impl Commands {
    /// Session options, for commands that start an agent session.
    pub fn session(&self) -> Option<&SessionArgs> {
        match self {
            Commands::Query { session, .. } | Commands::Interactive { session } => Some(session),
            Commands::Config(_) | Commands::History { .. } => None,
        }
    }
}

/// Insert `query` when the first argument is neither a known subcommand nor a flag,
/// so `kubectl assistant why is my pod pending` runs as a query.
pub fn rewrite_implicit_query(args: Vec<OsString>) -> Vec<OsString> {
    let Some(first) = args.get(1) else {
        return args;
    };
    let first = first.to_string_lossy();
    if first.starts_with('-') || KNOWN_COMMANDS.contains(&first.as_ref()) {
        return args;
    }
    let mut rewritten = Vec::with_capacity(args.len() + 1);
    rewritten.push(args[0].clone());
    rewritten.push(OsString::from("query"));
    rewritten.extend(args.into_iter().skip(1));
    rewritten
}
