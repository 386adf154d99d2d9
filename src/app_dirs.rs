//! Location of the `.studypass` application folder.
//!
//! The folder sits under the OS config directory (`~/.config` on Linux,
//! `%APPDATA%` on Windows). Setting `STUDYPASS_CONFIG_HOME` replaces that base,
//! which keeps test runs and portable setups out of the user's profile.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".studypass";

/// Environment variable that replaces the OS config base.
pub const CONFIG_HOME_ENV: &str = "STUDYPASS_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory found; set {CONFIG_HOME_ENV} to choose one")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Directory that receives per-run log files, created on demand.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    logs_dir_in(&config_base()?)
}

/// `<base>/.studypass/logs`, created on demand.
pub fn logs_dir_in(base: &Path) -> Result<PathBuf, AppDirError> {
    let path = base.join(APP_DIR_NAME).join(LOGS_DIR_NAME);
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn config_base() -> Result<PathBuf, AppDirError> {
    match std::env::var_os(CONFIG_HOME_ENV) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => BaseDirs::new()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(AppDirError::NoBaseDir),
    }
}
