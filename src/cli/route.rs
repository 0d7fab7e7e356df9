//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::agent::{AssistantSession, ObservedTool, ReactEngine};
use crate::cli::parse::{Commands, ConfigArgs, SessionArgs};
use crate::cli::presentation::{format_config_view, format_history, format_history_cleared};
use crate::config::AssistantConfig;
use crate::display::TerminalFormatter;
use crate::error::ApiError;
use crate::provider::{build_client, resolve_provider, ProviderConfig};
use crate::runner::CommandRunner;
use crate::settings::{SettingsStore, SettingsUpdate};
use crate::transcript::TranscriptStore;
use std::io::Stdout;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Runtime context for CLI execution: application config and the two per-user stores.
pub struct RunContext {
    config: AssistantConfig,
    settings: SettingsStore,
    transcripts: TranscriptStore,
}

impl RunContext {
    /// Create run context backed by the default per-user file locations.
    pub fn new(config: AssistantConfig) -> Result<Self, ApiError> {
        Ok(Self::with_stores(
            config,
            SettingsStore::open_default()?,
            TranscriptStore::open_default()?,
        ))
    }

    pub fn with_stores(
        config: AssistantConfig,
        settings: SettingsStore,
        transcripts: TranscriptStore,
    ) -> Self {
        if let Err(e) = settings.ensure_exists() {
            warn!(path = %settings.path().display(), "Could not create settings file: {}", e);
        }
        Self {
            config,
            settings,
            transcripts,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// Execute a CLI command via the single route table.
    ///
    /// Session commands print as they run and return an empty string.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Config(args) => self.handle_config(args),
            Commands::Query { query, session } => self.handle_query(&query.join(" "), session),
            Commands::Interactive { session } => self.handle_interactive(session),
            Commands::History { show: _, clear } => self.handle_history(*clear),
        }
    }

    fn handle_config(&self, args: &ConfigArgs) -> Result<String, ApiError> {
        if args.view {
            return Ok(format_config_view(&self.settings.view()?));
        }
        if args.clear {
            self.settings.clear()?;
            return Ok("Configuration cleared successfully".to_string());
        }

        let mut lines = Vec::new();
        if let Some(kind) = args.set_provider {
            self.settings.set_provider(kind)?;
            lines.push(format!("Provider set to: {}", kind));
        }
        if let Some(key) = &args.set_openai_key {
            self.settings.update(SettingsUpdate::OpenAi {
                api_key: Some(key.clone()),
                model: None,
            })?;
            lines.push("OpenAI API key updated".to_string());
        }
        if let Some(model) = &args.set_openai_model {
            self.settings.update(SettingsUpdate::OpenAi {
                api_key: None,
                model: Some(model.clone()),
            })?;
            lines.push(format!("OpenAI model set to: {}", model));
        }
        if let Some(key) = &args.set_azure_key {
            self.settings.update(azure_update(Some(key.clone()), None, None, None))?;
            lines.push("Azure OpenAI API key updated".to_string());
        }
        if let Some(endpoint) = &args.set_azure_endpoint {
            self.settings
                .update(azure_update(None, Some(endpoint.clone()), None, None))?;
            lines.push("Azure endpoint updated".to_string());
        }
        if let Some(deployment) = &args.set_azure_deployment {
            self.settings
                .update(azure_update(None, None, Some(deployment.clone()), None))?;
            lines.push(format!("Azure deployment set to: {}", deployment));
        }
        if let Some(version) = &args.set_azure_version {
            self.settings
                .update(azure_update(None, None, None, Some(version.clone())))?;
            lines.push(format!("Azure API version set to: {}", version));
        }
        Ok(lines.join("\n"))
    }

    fn handle_query(&self, query: &str, args: &SessionArgs) -> Result<String, ApiError> {
        let overrides = args.overrides();
        let provider = resolve_provider(&overrides, &self.settings.load(), env_lookup)?;

        // Overrides given for a single query become the new defaults.
        if let Some(update) = overrides.settings_update(provider.kind()) {
            self.settings.update(update)?;
        }
        if let Some(kind) = overrides.provider {
            self.settings.set_provider(kind)?;
        }

        let session = self.build_session(&provider, args)?;
        let runtime = runtime()?;
        runtime.block_on(session.run_query(query))?;
        Ok(String::new())
    }

    fn handle_interactive(&self, args: &SessionArgs) -> Result<String, ApiError> {
        let provider = resolve_provider(&args.overrides(), &self.settings.load(), env_lookup)?;
        let session = self.build_session(&provider, args)?;

        let runtime = runtime()?;
        let result = runtime.block_on(async {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let interrupt = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl-C handler unavailable: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            session.run_interactive(&self.transcripts, stdin, interrupt).await
        });
        // A stdin read may still be parked on a blocking thread after Ctrl-C.
        runtime.shutdown_background();
        result?;
        Ok(String::new())
    }

    fn handle_history(&self, clear: bool) -> Result<String, ApiError> {
        if clear {
            let removed = self.transcripts.clear()?;
            return Ok(format_history_cleared(removed));
        }
        Ok(format_history(&self.transcripts.load()))
    }

    fn build_session(
        &self,
        provider: &ProviderConfig,
        args: &SessionArgs,
    ) -> Result<AssistantSession<Stdout>, ApiError> {
        info!(
            provider = %provider.kind(),
            model = provider.model_name(),
            namespace = ?args.namespace,
            "Starting assistant session"
        );
        let mut display = self.config.display.clone();
        display.show_tool_calls = display.show_tool_calls && !args.no_tool_display;
        let formatter = Arc::new(TerminalFormatter::stdout(display));

        let runner = CommandRunner::from_config(&self.config.runner);
        let tool = ObservedTool::new(runner, Arc::clone(&formatter));
        let engine = ReactEngine::new(build_client(provider)?, self.config.agent.clone());

        Ok(
            AssistantSession::new(Box::new(engine), Box::new(tool), formatter)
                .with_namespace(args.namespace.clone()),
        )
    }
}

fn azure_update(
    api_key: Option<String>,
    endpoint: Option<String>,
    deployment: Option<String>,
    api_version: Option<String>,
) -> SettingsUpdate {
    SettingsUpdate::Azure {
        api_key,
        endpoint,
        deployment,
        api_version,
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn runtime() -> Result<Runtime, ApiError> {
    Runtime::new().map_err(ApiError::IoError)
}
