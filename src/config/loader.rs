//! Layered loading of [`AssistantConfig`] with the `config` crate.

use super::{paths, AssistantConfig};
use crate::error::ApiError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides, e.g. `KUBE_ASSISTANT_RUNNER__TIMEOUT_SECS=30`.
pub const ENV_PREFIX: &str = "KUBE_ASSISTANT";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default per-user config file plus environment overrides.
    pub fn load() -> Result<AssistantConfig, ApiError> {
        let path = paths::config_file_path()?;
        Self::load_from_file(&path)
    }

    /// Load from an explicit file plus environment overrides. A missing file is
    /// not an error; defaults apply.
    pub fn load_from_file(path: &Path) -> Result<AssistantConfig, ApiError> {
        debug!(config_path = %path.display(), "Loading configuration");

        let built = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AssistantConfig = built.try_deserialize()?;

        config.validate().map_err(|errors| {
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ))
        })?;

        Ok(config)
    }
}
