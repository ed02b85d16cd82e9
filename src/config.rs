//! Configuration management for lintsplice
//!
//! Stores settings in ~/.config/lintsplice/config.json

use crate::batch::DEFAULT_BATCH_CHAR_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Overrides `batch_char_limit` when set to a positive integer
pub const BATCH_LIMIT_ENV: &str = "LINTSPLICE_BATCH_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Character budget for a single batch
    pub batch_char_limit: usize,
    /// Include issues and refactoring objectives in request payloads
    pub include_issues: bool,
    /// Replaces the built-in rewrite instruction
    pub instruction: Option<String>,
    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_char_limit: DEFAULT_BATCH_CHAR_LIMIT,
            include_issues: true,
            instruction: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lintsplice"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from the user config directory, or return defaults
    pub fn load() -> Self {
        let config = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load config from `path`. A missing file yields defaults; an unreadable
    /// one is moved aside to `config.json.corrupt` and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted, a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Apply `LINTSPLICE_BATCH_LIMIT` if it holds a positive integer
    pub fn with_env_overrides(self) -> Self {
        let value = std::env::var(BATCH_LIMIT_ENV).ok();
        self.with_batch_limit_override(value.as_deref())
    }

    fn with_batch_limit_override(mut self, value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return self;
        };
        match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => self.batch_char_limit = limit,
            _ => warn!(value = raw, "ignoring invalid {}", BATCH_LIMIT_ENV),
        }
        self
    }

    /// Save config to the user config directory
    pub fn save(&self) -> Result<PathBuf> {
        let dir = Self::config_dir().context("Could not determine config directory")?;
        self.save_in(&dir)
    }

    /// Create `dir` if needed and write `config.json` into it
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).context("Failed to create config directory")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                warn!(error = %e, "failed to set config directory permissions");
            }
        }

        let path = dir.join("config.json");
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write config as pretty JSON to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        #[cfg(unix)]
        {
            write_config_atomic(path, &content).context("Failed to write config")?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, content).context("Failed to write config")?;
        }

        Ok(())
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/lintsplice/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        warn!(error = %e, "failed to set temp config file permissions");
    }

    file.write_all(content.as_bytes())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
