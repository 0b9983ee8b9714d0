//! Runner configuration.
//!
//! Holds the run-wide defaults a build engine would set once: the global
//! environment-override table, default stream importances, and the default
//! timeout. The override table is an explicit value threaded through the
//! runner, layered under per-invocation overrides and over the inherited
//! environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::MessageImportance;

/// Global environment overrides applied to every tool launch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOverrides {
    /// Variables set (or replaced) in the child environment.
    pub set: BTreeMap<String, String>,
    /// Variables removed from the inherited environment.
    pub unset: Vec<String>,
}

impl EnvOverrides {
    /// Flatten into the layered form the launcher consumes.
    #[must_use]
    pub fn to_layers(&self) -> Vec<(String, Option<String>)> {
        let mut layers: Vec<(String, Option<String>)> = self
            .set
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect();
        layers.extend(self.unset.iter().map(|name| (name.clone(), None)));
        layers
    }
}

/// Per-stream importance defaults for non-diagnostic output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamImportances {
    /// Importance of plain stdout lines.
    pub stdout: MessageImportance,
    /// Importance of plain stderr lines.
    pub stderr: MessageImportance,
}

impl Default for StreamImportances {
    fn default() -> Self {
        Self {
            stdout: MessageImportance::Low,
            stderr: MessageImportance::Normal,
        }
    }
}

/// Configuration for [`ToolRunner`](crate::orchestrator::ToolRunner).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Default timeout in seconds for a run; 0 or absent means unbounded.
    pub timeout_secs: Option<u64>,
    /// Importance levels for plain messages, per stream.
    pub streams: StreamImportances,
    /// Environment overrides applied to every launch.
    pub env: EnvOverrides,
}

impl RunnerConfig {
    /// Default timeout as a `Duration`, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|&s| s > 0).map(Duration::from_secs)
    }

    /// Load configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from the user config directory, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only if a config file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let Some(config_dir) = dirs::config_dir() else {
            tracing::debug!("no config directory on this platform, using defaults");
            return Ok(Self::default());
        };
        let path = config_dir.join("toolrun").join("config.toml");
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config file");
            Self::load_from_path(&path)
        } else {
            tracing::debug!("no config file found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file could not be parsed as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
