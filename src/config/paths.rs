//! Per-user file locations.
//!
//! Uses the platform directories from `directories::ProjectDirs`. Setting
//! `KUBE_ASSISTANT_HOME` places every file in that single directory instead.

use crate::error::ApiError;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable that relocates all per-user files
pub const HOME_ENV: &str = "KUBE_ASSISTANT_HOME";

const APPLICATION: &str = "kubectl-assistant";

pub const SETTINGS_FILE: &str = "settings.json";
pub const CONFIG_FILE: &str = "config.toml";
pub const TRANSCRIPT_FILE: &str = "transcript.bin";
pub const LOG_FILE: &str = "kubectl-assistant.log";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn project_dirs() -> Result<ProjectDirs, ApiError> {
    ProjectDirs::from("", "", APPLICATION).ok_or_else(|| {
        ApiError::ConfigError(format!(
            "Unable to determine a home directory; set {} to choose where files are stored",
            HOME_ENV
        ))
    })
}

/// Directory holding `settings.json` and `config.toml`.
pub fn config_dir() -> Result<PathBuf, ApiError> {
    if let Some(root) = home_override() {
        return Ok(root);
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Directory holding the conversation transcript.
pub fn data_dir() -> Result<PathBuf, ApiError> {
    if let Some(root) = home_override() {
        return Ok(root);
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Directory holding log files. Falls back to the local data dir on platforms
/// without a state directory.
pub fn state_dir() -> Result<PathBuf, ApiError> {
    if let Some(root) = home_override() {
        return Ok(root);
    }
    let dirs = project_dirs()?;
    Ok(dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_local_dir())
        .to_path_buf())
}

pub fn settings_path() -> Result<PathBuf, ApiError> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

pub fn config_file_path() -> Result<PathBuf, ApiError> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

pub fn transcript_path() -> Result<PathBuf, ApiError> {
    Ok(data_dir()?.join(TRANSCRIPT_FILE))
}

pub fn default_log_file() -> Result<PathBuf, ApiError> {
    Ok(state_dir()?.join(LOG_FILE))
}
