//! Persistent provider settings.
//!
//! A small JSON document in the per-user config directory holding the active provider
//! and the credentials for each provider. Every update is a read-modify-write that is
//! persisted before returning. A missing or unparseable file reads as the defaults; a
//! malformed section falls back on its own without disturbing the others.

use crate::error::{ApiError, StorageError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// LLM backend selected for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Azure,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" => Ok(ProviderKind::Azure),
            other => Err(format!(
                "Provider must be 'openai' or 'azure', got '{}'",
                other
            )),
        }
    }
}

/// Same rules as the command-line flag, so a hand-edited `"Azure"` still loads.
impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Treat JSON `null` as the empty string so the record shape stays stable.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    #[serde(deserialize_with = "nullable_string")]
    pub api_key: String,
    #[serde(deserialize_with = "nullable_string")]
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    #[serde(deserialize_with = "nullable_string")]
    pub api_key: String,
    #[serde(deserialize_with = "nullable_string")]
    pub endpoint: String,
    #[serde(deserialize_with = "nullable_string")]
    pub deployment: String,
    #[serde(deserialize_with = "nullable_string")]
    pub api_version: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            deployment: String::new(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }
}

/// The whole settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsRecord {
    pub provider: ProviderKind,
    pub openai: OpenAiSettings,
    pub azure: AzureSettings,
}

/// Provider-specific block of the settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSection {
    OpenAi,
    Azure,
}

/// Field-wise change to one section; `None` leaves the field unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsUpdate {
    OpenAi {
        api_key: Option<String>,
        model: Option<String>,
    },
    Azure {
        api_key: Option<String>,
        endpoint: Option<String>,
        deployment: Option<String>,
        api_version: Option<String>,
    },
}

impl SettingsUpdate {
    pub fn section(&self) -> SettingsSection {
        match self {
            SettingsUpdate::OpenAi { .. } => SettingsSection::OpenAi,
            SettingsUpdate::Azure { .. } => SettingsSection::Azure,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SettingsUpdate::OpenAi { api_key, model } => api_key.is_none() && model.is_none(),
            SettingsUpdate::Azure {
                api_key,
                endpoint,
                deployment,
                api_version,
            } => {
                api_key.is_none()
                    && endpoint.is_none()
                    && deployment.is_none()
                    && api_version.is_none()
            }
        }
    }
}

fn assign(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl SettingsRecord {
    pub fn apply(&mut self, update: SettingsUpdate) {
        match update {
            SettingsUpdate::OpenAi { api_key, model } => {
                assign(&mut self.openai.api_key, api_key);
                assign(&mut self.openai.model, model);
            }
            SettingsUpdate::Azure {
                api_key,
                endpoint,
                deployment,
                api_version,
            } => {
                assign(&mut self.azure.api_key, api_key);
                assign(&mut self.azure.endpoint, endpoint);
                assign(&mut self.azure.deployment, deployment);
                assign(&mut self.azure.api_version, api_version);
            }
        }
    }

    pub fn section(&self, section: SettingsSection) -> BTreeMap<&'static str, String> {
        let mut fields = BTreeMap::new();
        match section {
            SettingsSection::OpenAi => {
                fields.insert("api_key", self.openai.api_key.clone());
                fields.insert("model", self.openai.model.clone());
            }
            SettingsSection::Azure => {
                fields.insert("api_key", self.azure.api_key.clone());
                fields.insert("endpoint", self.azure.endpoint.clone());
                fields.insert("deployment", self.azure.deployment.clone());
                fields.insert("api_version", self.azure.api_version.clone());
            }
        }
        fields
    }

    /// Copy with every credential passed through [`redact`].
    pub fn redacted(&self) -> SettingsRecord {
        let mut copy = self.clone();
        copy.openai.api_key = redact(&self.openai.api_key);
        copy.azure.api_key = redact(&self.azure.api_key);
        copy
    }
}

/// Mask a credential for display: `***` plus the last four characters when longer
/// than four, `***` alone when shorter, empty when unset.
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        String::new()
    } else if count > 4 {
        let tail: String = secret.chars().skip(count - 4).collect();
        format!("***{}", tail)
    } else {
        "***".to_string()
    }
}

/// File-backed settings for one user.
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at the default per-user location.
    pub fn open_default() -> Result<Self, ApiError> {
        Ok(Self::new(crate::config::paths::settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record; defaults when the file is missing or malformed.
    pub fn load(&self) -> SettingsRecord {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SettingsRecord::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read settings, using defaults: {}", e);
                return SettingsRecord::default();
            }
        };
        let document: Value = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), "Malformed settings file, using defaults: {}", e);
                return SettingsRecord::default();
            }
        };
        let Value::Object(mut fields) = document else {
            warn!(path = %self.path.display(), "Settings file is not a JSON object, using defaults");
            return SettingsRecord::default();
        };

        // Each section stands alone: one bad section must not reset the others.
        let defaults = SettingsRecord::default();
        SettingsRecord {
            provider: self.section_or("provider", fields.remove("provider"), defaults.provider),
            openai: self.section_or("openai", fields.remove("openai"), defaults.openai),
            azure: self.section_or("azure", fields.remove("azure"), defaults.azure),
        }
    }

    fn section_or<T: DeserializeOwned>(&self, name: &str, value: Option<Value>, fallback: T) -> T {
        match value {
            None | Some(Value::Null) => fallback,
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(
                    path = %self.path.display(),
                    section = name,
                    "Ignoring malformed settings section: {}",
                    e
                );
                fallback
            }),
        }
    }

    /// Write the defaults if no settings file exists yet.
    pub fn ensure_exists(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        if self.path.exists() {
            return Ok(());
        }
        self.write(&SettingsRecord::default())
    }

    pub fn provider(&self) -> ProviderKind {
        self.load().provider
    }

    pub fn get(&self, section: SettingsSection) -> BTreeMap<&'static str, String> {
        self.load().section(section)
    }

    pub fn set_provider(&self, provider: ProviderKind) -> Result<SettingsRecord, StorageError> {
        let _guard = self.write_lock.lock();
        let mut record = self.load();
        record.provider = provider;
        self.write(&record)?;
        Ok(record)
    }

    pub fn update(&self, update: SettingsUpdate) -> Result<SettingsRecord, StorageError> {
        let _guard = self.write_lock.lock();
        let mut record = self.load();
        record.apply(update);
        self.write(&record)?;
        Ok(record)
    }

    /// Pretty JSON of the current record with credentials redacted.
    pub fn view(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&self.load().redacted()).map_err(|e| StorageError::Encode {
            what: "settings",
            reason: e.to_string(),
        })
    }

    /// Reset the file to the defaults.
    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        self.write(&SettingsRecord::default())
    }

    fn write(&self, record: &SettingsRecord) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record).map_err(|e| StorageError::Encode {
            what: "settings",
            reason: e.to_string(),
        })?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::IoError(e)
        })?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
