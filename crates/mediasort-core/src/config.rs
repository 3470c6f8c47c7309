use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Directory used for run artefacts (checkpoint, manifests, error logs) when
/// no explicit path is configured. Desktop first so the files are easy to
/// find, falling back to the home directory.
pub fn default_state_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_checkpoint_path() -> PathBuf {
    default_state_dir().join("mediasort.checkpoint")
}

fn default_tool_timeout() -> u64 {
    10
}

fn default_min_disk_space() -> u64 {
    100
}

/// Configuration for an organization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether to run without making changes
    pub dry_run: bool,

    /// Whether to verify every move with a content hash and roll back on mismatch
    pub verify_hash: bool,

    /// Skip the extraction phase (files already at the top level)
    pub skip_extract: bool,

    /// Skip the empty-directory cleanup phase
    pub skip_cleanup: bool,

    /// Where resume state is persisted
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// Directory for undo manifests
    #[serde(default = "default_state_dir")]
    pub manifest_dir: PathBuf,

    /// Directory for per-run error logs
    #[serde(default = "default_state_dir")]
    pub error_log_dir: PathBuf,

    /// Keep error log files even when a run finishes with zero errors
    pub keep_empty_error_log: bool,

    /// Budget for each external tool invocation, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Advisory free-space floor in MB; low space is logged, never blocks
    #[serde(default = "default_min_disk_space")]
    pub min_disk_space_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            verify_hash: false,
            skip_extract: false,
            skip_cleanup: false,
            checkpoint_path: default_checkpoint_path(),
            manifest_dir: default_state_dir(),
            error_log_dir: default_state_dir(),
            keep_empty_error_log: false,
            tool_timeout_secs: default_tool_timeout(),
            min_disk_space_mb: default_min_disk_space(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(Error::Configuration(
                "tool_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.checkpoint_path.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "checkpoint_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tool_timeout_secs, 10);
        assert!(!config.verify_hash);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            tool_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.verify_hash = true;
        config.tool_timeout_secs = 5;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert!(loaded.verify_hash);
        assert_eq!(loaded.tool_timeout_secs, 5);
    }
}
