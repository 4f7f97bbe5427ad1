//! Lock configuration persistence
//!
//! Holds the dwell times and prompt used by the lock controller. Stored as
//! JSON under the user's config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};
use crate::services::Route;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration directory under ~/.config
const CONFIG_DIR_NAME: &str = "journal-guard";

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "JOURNAL_GUARD_CONFIG";

/// Default dwell time before the journal locks again
pub const DEFAULT_RELOCK_DELAY_MS: u64 = 10_000;

/// Default delay before moving on to the journal body after unlock
pub const DEFAULT_NAVIGATION_DELAY_MS: u64 = 500;

/// Lock controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Time spent unlocked before the re-lock timer fires (milliseconds)
    #[serde(default = "default_relock_delay_ms")]
    pub relock_delay_ms: u64,

    /// Time between unlock and the navigation to `unlock_route` (milliseconds)
    #[serde(default = "default_navigation_delay_ms")]
    pub navigation_delay_ms: u64,

    /// Prompt passed to the device authenticator
    #[serde(default = "default_unlock_prompt")]
    pub unlock_prompt: String,

    /// Route visited once after a successful unlock
    #[serde(default = "default_unlock_route")]
    pub unlock_route: Route,

    /// Request an unlock as soon as the controller starts
    #[serde(default)]
    pub unlock_on_start: bool,
}

fn default_relock_delay_ms() -> u64 {
    DEFAULT_RELOCK_DELAY_MS
}

fn default_navigation_delay_ms() -> u64 {
    DEFAULT_NAVIGATION_DELAY_MS
}

fn default_unlock_prompt() -> String {
    "Authenticate to open your journal".to_string()
}

fn default_unlock_route() -> Route {
    Route::JournalBody
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            relock_delay_ms: DEFAULT_RELOCK_DELAY_MS,
            navigation_delay_ms: DEFAULT_NAVIGATION_DELAY_MS,
            unlock_prompt: default_unlock_prompt(),
            unlock_route: default_unlock_route(),
            unlock_on_start: false,
        }
    }
}

impl LockConfig {
    /// Set the re-lock dwell time
    pub fn with_relock_delay(mut self, delay: Duration) -> Self {
        self.relock_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the post-unlock navigation delay
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Re-lock dwell time
    pub fn relock_delay(&self) -> Duration {
        Duration::from_millis(self.relock_delay_ms)
    }

    /// Post-unlock navigation delay
    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    /// Check that the configuration can drive a controller
    pub fn validate(&self) -> Result<()> {
        if self.relock_delay_ms == 0 {
            return Err(GuardError::Config(
                "relock_delay_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
        }

        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME))
    }

    /// Get the full config file path, honoring `JOURNAL_GUARD_CONFIG`
    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        Self::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults
    ///
    /// A missing file is not an error. A file that cannot be read or parsed
    /// is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LockConfig::default();
        assert_eq!(config.relock_delay(), Duration::from_secs(10));
        assert_eq!(config.navigation_delay(), Duration::from_millis(500));
        assert_eq!(config.unlock_route, Route::JournalBody);
        assert!(!config.unlock_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_relock_delay_rejected() {
        let config = LockConfig::default().with_relock_delay(Duration::ZERO);
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let config = LockConfig::default()
            .with_relock_delay(Duration::MAX)
            .with_navigation_delay(Duration::from_secs(u64::MAX));
        assert_eq!(config.relock_delay_ms, u64::MAX);
        assert_eq!(config.navigation_delay_ms, u64::MAX);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: LockConfig = serde_json::from_str(r#"{"relock_delay_ms": 1000}"#).unwrap();
        assert_eq!(config.relock_delay_ms, 1000);
        assert_eq!(config.navigation_delay_ms, DEFAULT_NAVIGATION_DELAY_MS);
        assert_eq!(config.unlock_route, Route::JournalBody);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = LockConfig {
            relock_delay_ms: 1000,
            navigation_delay_ms: 250,
            unlock_prompt: "Unlock".to_string(),
            unlock_route: Route::JournalBack,
            unlock_on_start: true,
        };
        config.save(&path).unwrap();

        let loaded = LockConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        assert_eq!(LockConfig::load_or_default(&path), LockConfig::default());
        assert_eq!(
            LockConfig::load_or_default(&dir.path().join("absent.json")),
            LockConfig::default()
        );
    }
}
