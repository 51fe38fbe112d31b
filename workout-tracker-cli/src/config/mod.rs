use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use workout_tracker::{ApiConfig, SessionConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: String,
}

/// Plan tracked when no `--plan`/`--client` is given
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub plan_id: String,

    #[serde(default)]
    pub client_id: String,
}

impl Config {
    /// Get config directory path (~/.workout-tracker/)
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".workout-tracker"))
    }

    /// Get config file path (~/.workout-tracker/config.toml)
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load configuration from `path`, falling back to defaults when it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Check if a bearer token is configured
    pub fn is_authenticated(&self) -> bool {
        !self.auth.token.is_empty()
    }

    /// Resolve the plan/client pair, command line first
    pub fn progress_target(
        &self,
        plan_id: Option<String>,
        client_id: Option<String>,
    ) -> Result<(String, String)> {
        let plan_id = plan_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.target.plan_id.clone());
        let client_id = client_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.target.client_id.clone());

        if plan_id.is_empty() {
            bail!("No plan selected. Pass --plan or set target.plan_id in the config file");
        }
        if client_id.is_empty() {
            bail!("No client selected. Pass --client or set target.client_id in the config file");
        }

        Ok((plan_id, client_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.session.autosave_debounce_seconds, 10);
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.auth.token = "abc".to_string();
        config.target.plan_id = "42".to_string();
        config.session.default_rest_seconds = 75;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.is_authenticated());
        assert_eq!(loaded.target.plan_id, "42");
        assert_eq!(loaded.session.default_rest_seconds, 75);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nbase_url = \"https://coach.example.com\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://coach.example.com");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.session.default_reps, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.target.plan_id.is_empty());
    }

    #[test]
    fn test_progress_target_prefers_arguments() {
        let mut config = Config::default();
        config.target.plan_id = "1".to_string();
        config.target.client_id = "2".to_string();

        let target = config.progress_target(Some("9".to_string()), None).unwrap();
        assert_eq!(target, ("9".to_string(), "2".to_string()));

        let empty = Config::default();
        assert!(empty.progress_target(None, Some("2".to_string())).is_err());
    }
}
