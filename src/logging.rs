//! Tracing setup for experiment runs.
//!
//! Events go to stderr so stdout carries only the report. Unless disabled in
//! the config, each run also writes a plain-text copy to
//! `<app root>/logs/studypass_<timestamp>.log`, keeping the newest
//! `max_files` logs.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

const LOG_FILE_PREFIX: &str = "studypass";
const LOG_EXTENSION: &str = "log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static INSTALLED: OnceLock<()> = OnceLock::new();

/// `[logging]` section of the experiment config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Write a per-run log file next to stderr output.
    pub file: bool,
    /// Number of run logs kept after pruning.
    pub max_files: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            max_files: 10,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to create log file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to prune logs in {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log filename time: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Invalid log level {level:?}: {message}")]
    InvalidLevel { level: String, message: String },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber. Returns the run's log file path when file
/// logging is on. Calls after the first successful one do nothing.
pub fn init(settings: &LogSettings) -> Result<Option<PathBuf>, LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(None);
    }
    let filter = env_filter(&settings.level)?;
    let timer = local_timer();

    let (file_layer, log_path) = if settings.file {
        let dir = app_dirs::logs_dir()?;
        let path = dir.join(log_file_name(now_local_or_utc())?);
        let file = File::create(&path).map_err(|source| LoggingError::CreateFile {
            path: path.clone(),
            source,
        })?;
        prune_old_logs(&dir, settings.max_files.max(1))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        let _ = FILE_GUARD.set(guard);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_timer(timer.clone())
            .with_writer(writer);
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_timer(timer)
        .with_writer(std::io::stderr);
    let subscriber = Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = INSTALLED.set(());

    match &log_path {
        Some(path) => tracing::debug!("Writing run log to {}", path.display()),
        None => tracing::debug!("File logging disabled"),
    }
    Ok(log_path)
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|err| LoggingError::InvalidLevel {
        level: level.to_string(),
        message: err.to_string(),
    })
}

/// Delete the oldest `.log` files in `dir` until at most `keep` remain.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let prune_err = |source: std::io::Error| LoggingError::Prune {
        path: dir.to_path_buf(),
        source,
    };
    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(prune_err)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(LOG_EXTENSION)
        {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        logs.push((modified, path));
    }
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(prune_err)?;
    }
    Ok(())
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[BorrowedFormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!(
        "{LOG_FILE_PREFIX}_{}.{LOG_EXTENSION}",
        now.format(NAME_FORMAT)?
    ))
}

fn local_timer() -> OffsetTime<BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn file_name_carries_prefix_and_timestamp() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name(fixed).unwrap(),
            "studypass_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn pruning_drops_oldest_run_logs_only() {
        let dir = tempdir().unwrap();
        for idx in 0..5 {
            fs::write(dir.path().join(format!("studypass_{idx}.log")), "").unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        prune_old_logs(dir.path(), 3).unwrap();

        assert!(!dir.path().join("studypass_0.log").exists());
        assert!(!dir.path().join("studypass_1.log").exists());
        assert!(dir.path().join("studypass_2.log").exists());
        assert!(dir.path().join("studypass_4.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn pruning_below_limit_keeps_everything() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("studypass_a.log"), "").unwrap();
        prune_old_logs(dir.path(), 10).unwrap();
        assert!(dir.path().join("studypass_a.log").exists());
    }

    #[test]
    fn settings_default_to_info_with_file() {
        let settings = LogSettings::default();
        assert_eq!(settings.level, "info");
        assert!(settings.file);
        assert_eq!(settings.max_files, 10);
    }
}
