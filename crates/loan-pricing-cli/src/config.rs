//! CLI configuration.
//!
//! Resolution order: built-in defaults, then the TOML file given with
//! `--config`, then environment variables and flags (clap merges those two).

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub log_level: LogLevel,
    /// Directory exported workbooks are delivered into.
    pub export_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            log_level: LogLevel::default(),
            export_dir: PathBuf::from("exports"),
        }
    }
}

/// Values from flags or environment; `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    log_level: Option<LogLevel>,
    export_dir: Option<PathBuf>,
}

pub fn build_config(overrides: &ConfigOverrides) -> Result<CliConfig, ConfigError> {
    let mut config = CliConfig::default();

    if let Some(path) = &overrides.config_file {
        let file = load_file(path)?;
        if let Some(level) = file.log_level {
            config.log_level = level;
        }
        if let Some(dir) = file.export_dir {
            config.export_dir = dir;
        }
    }

    if let Some(level) = &overrides.log_level {
        config.log_level = level.parse()?;
    }
    if let Some(dir) = &overrides.export_dir {
        config.export_dir = dir.clone();
    }

    Ok(config)
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::FileError(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| ConfigError::FileError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = build_config(&ConfigOverrides::default()).unwrap();
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.export_dir, PathBuf::from("exports"));
    }

    #[test]
    fn test_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lpc.toml");
        fs::write(&path, "log_level = \"debug\"\nexport_dir = \"/tmp/memos\"\n").unwrap();

        let from_file = build_config(&ConfigOverrides {
            config_file: Some(path.clone()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(from_file.log_level, LogLevel::Debug);
        assert_eq!(from_file.export_dir, PathBuf::from("/tmp/memos"));

        let flagged = build_config(&ConfigOverrides {
            config_file: Some(path),
            log_level: Some("ERROR".into()),
            export_dir: None,
        })
        .unwrap();
        assert_eq!(flagged.log_level, LogLevel::Error);
        assert_eq!(flagged.export_dir, PathBuf::from("/tmp/memos"));
    }

    #[test]
    fn test_invalid_values() {
        let err = build_config(&ConfigOverrides {
            log_level: Some("loud".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "colour = \"red\"\n").unwrap();
        let err = build_config(&ConfigOverrides {
            config_file: Some(path),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileError(_)));
    }
}
