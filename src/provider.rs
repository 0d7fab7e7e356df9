//! Model Provider Abstraction
//!
//! Provider selection and chat-completion clients. The active provider is a tagged
//! [`ProviderConfig`] resolved from command-line overrides, the settings store and the
//! process environment, in that order. Both backends speak the OpenAI chat-completions
//! wire format and differ only in URL and authentication header.

use crate::error::ApiError;
use crate::settings::{SettingsRecord, SettingsUpdate, DEFAULT_AZURE_API_VERSION, DEFAULT_OPENAI_MODEL};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub use crate::settings::ProviderKind;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Fully resolved provider credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    OpenAi {
        api_key: String,
        model: String,
    },
    Azure {
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::OpenAi { .. } => ProviderKind::OpenAi,
            ProviderConfig::Azure { .. } => ProviderKind::Azure,
        }
    }

    /// Model or deployment name, for logging.
    pub fn model_name(&self) -> &str {
        match self {
            ProviderConfig::OpenAi { model, .. } => model,
            ProviderConfig::Azure { deployment, .. } => deployment,
        }
    }
}

/// Provider values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub openai_api_key: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
}

impl ProviderOverrides {
    /// Settings change recording the overrides that belong to `kind`, if any were given.
    pub fn settings_update(&self, kind: ProviderKind) -> Option<SettingsUpdate> {
        let update = match kind {
            ProviderKind::OpenAi => SettingsUpdate::OpenAi {
                api_key: self.openai_api_key.clone(),
                model: self.model.clone(),
            },
            ProviderKind::Azure => SettingsUpdate::Azure {
                api_key: self.azure_api_key.clone(),
                endpoint: self.azure_endpoint.clone(),
                deployment: self.azure_deployment.clone(),
                api_version: self.azure_api_version.clone(),
            },
        };
        (!update.is_empty()).then_some(update)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First non-empty value of flag, stored setting, environment variable.
fn pick<F>(flag: Option<&String>, stored: &str, env_var: &str, env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(flag.map(String::as_str))
        .or_else(|| non_empty(Some(stored)))
        .or_else(|| non_empty(env(env_var).as_deref()))
}

fn missing(what: &str, flag: &str, env_var: &str) -> ApiError {
    ApiError::MissingCredential(format!(
        "{} is required. Set with {}, config command, or {} environment variable.",
        what, flag, env_var
    ))
}

/// Resolve the active provider. Precedence per field: flag, stored setting, environment.
///
/// `env` looks up an environment variable; the binary passes `std::env::var(..).ok()`.
pub fn resolve_provider<F>(
    overrides: &ProviderOverrides,
    settings: &SettingsRecord,
    env: F,
) -> Result<ProviderConfig, ApiError>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = overrides.provider.unwrap_or(settings.provider);
    debug!(provider = %kind, "Resolving provider credentials");

    match kind {
        ProviderKind::OpenAi => {
            let api_key = pick(
                overrides.openai_api_key.as_ref(),
                &settings.openai.api_key,
                "OPENAI_API_KEY",
                &env,
            )
            .ok_or_else(|| missing("OpenAI API key", "--openai-api-key", "OPENAI_API_KEY"))?;
            let model = pick(
                overrides.model.as_ref(),
                &settings.openai.model,
                "OPENAI_MODEL",
                &env,
            )
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            Ok(ProviderConfig::OpenAi { api_key, model })
        }
        ProviderKind::Azure => {
            let api_key = pick(
                overrides.azure_api_key.as_ref(),
                &settings.azure.api_key,
                "AZURE_OPENAI_API_KEY",
                &env,
            )
            .ok_or_else(|| {
                missing(
                    "Azure OpenAI API key",
                    "--azure-api-key",
                    "AZURE_OPENAI_API_KEY",
                )
            })?;
            let endpoint = pick(
                overrides.azure_endpoint.as_ref(),
                &settings.azure.endpoint,
                "AZURE_OPENAI_ENDPOINT",
                &env,
            )
            .ok_or_else(|| {
                missing(
                    "Azure OpenAI endpoint",
                    "--azure-endpoint",
                    "AZURE_OPENAI_ENDPOINT",
                )
            })?;
            let deployment = pick(
                overrides.azure_deployment.as_ref(),
                &settings.azure.deployment,
                "AZURE_OPENAI_DEPLOYMENT",
                &env,
            )
            .ok_or_else(|| {
                missing(
                    "Azure OpenAI deployment name",
                    "--azure-deployment",
                    "AZURE_OPENAI_DEPLOYMENT",
                )
            })?;
            let api_version = pick(
                overrides.azure_api_version.as_ref(),
                &settings.azure.api_version,
                "AZURE_OPENAI_API_VERSION",
                &env,
            )
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
            Ok(ProviderConfig::Azure {
                api_key,
                endpoint,
                deployment,
                api_version,
            })
        }
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
}

/// Chat-completion backend used by the reasoning engine.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Generate a completion from a list of messages, returning the assistant text.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, ApiError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), error.to_string())
    } else if error.is_timeout() {
        ApiError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn map_status(status: u16, detail: String) -> ApiError {
    match status {
        401 => ApiError::ProviderAuthFailed(format!("Authentication failed: {}", detail)),
        429 => ApiError::ProviderRateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => ApiError::ProviderModelNotFound(format!("Model not found: {}", detail)),
        _ => ApiError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// POST one chat-completions request and extract the first choice's text.
async fn send_chat_request(
    request: reqwest::RequestBuilder,
    body: &ChatCompletionRequest<'_>,
) -> Result<String, ApiError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(map_http_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(map_status(status.as_u16(), error_text));
    }

    let completion: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|e| ApiError::ProviderError(format!("Failed to parse response: {}", e)))?;

    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| ApiError::ProviderError("No choices in response".to_string()))
}

/// OpenAI provider client
pub struct OpenAIClient {
    client: Client,
    model: String,
    api_key: String,
    url: String,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
            url: OPENAI_CHAT_URL.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, ApiError> {
        let body = ChatCompletionRequest {
            model: Some(&self.model),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop,
        };
        let request = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        send_chat_request(request, &body).await
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Azure OpenAI provider client; the deployment selects the model.
pub struct AzureOpenAIClient {
    client: Client,
    deployment: String,
    api_key: String,
    url: String,
}

impl AzureOpenAIClient {
    pub fn new(
        endpoint: &str,
        deployment: String,
        api_version: &str,
        api_key: String,
    ) -> Result<Self, ApiError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );
        Ok(Self {
            client: build_provider_http_client()?,
            deployment,
            api_key,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatClient for AzureOpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, ApiError> {
        let body = ChatCompletionRequest {
            model: None,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stop: options.stop,
        };
        let request = self.client.post(&self.url).header("api-key", &self.api_key);
        send_chat_request(request, &body).await
    }

    fn provider_name(&self) -> &str {
        "azure"
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }
}

/// Build the chat client for a resolved provider.
pub fn build_client(config: &ProviderConfig) -> Result<Box<dyn ChatClient>, ApiError> {
    match config {
        ProviderConfig::OpenAi { api_key, model } => {
            Ok(Box::new(OpenAIClient::new(model.clone(), api_key.clone())?))
        }
        ProviderConfig::Azure {
            api_key,
            endpoint,
            deployment,
            api_version,
        } => Ok(Box::new(AzureOpenAIClient::new(
            endpoint,
            deployment.clone(),
            api_version,
            api_key.clone(),
        )?)),
    }
}
