use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::SetDefaults;

/// Progress endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Path template with `{plan_id}` and `{client_id}` placeholders
    #[serde(default = "default_progress_path")]
    pub progress_path: String,
}

/// Session behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_autosave_debounce")]
    pub autosave_debounce_seconds: u64,

    #[serde(default = "default_rest_seconds")]
    pub default_rest_seconds: u32,

    #[serde(default = "default_reps")]
    pub default_reps: u32,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_progress_path() -> String {
    "/api/clients/{client_id}/plans/{plan_id}/progress".to_string()
}

fn default_autosave_debounce() -> u64 {
    10
}

fn default_rest_seconds() -> u32 {
    60
}

fn default_reps() -> u32 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            progress_path: default_progress_path(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_seconds: default_autosave_debounce(),
            default_rest_seconds: default_rest_seconds(),
            default_reps: default_reps(),
        }
    }
}

impl ApiConfig {
    /// Build the progress endpoint URL for a plan/client pair
    pub fn progress_url(&self, plan_id: &str, client_id: &str) -> String {
        let path = self
            .progress_path
            .replace("{plan_id}", plan_id)
            .replace("{client_id}", client_id);

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl SessionConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_secs(self.autosave_debounce_seconds)
    }

    pub fn set_defaults(&self) -> SetDefaults {
        SetDefaults {
            reps: self.default_reps,
            rest_seconds: self.default_rest_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let api = ApiConfig::default();
        assert_eq!(api.base_url, "http://localhost:3000");
        assert_eq!(api.timeout_seconds, 30);

        let session = SessionConfig::default();
        assert_eq!(session.autosave_delay(), Duration::from_secs(10));
        assert_eq!(session.set_defaults(), SetDefaults::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let session: SessionConfig =
            serde_json::from_str(r#"{"default_rest_seconds": 90}"#).unwrap();
        assert_eq!(session.default_rest_seconds, 90);
        assert_eq!(session.default_reps, 10);
        assert_eq!(session.autosave_debounce_seconds, 10);
    }

    #[test]
    fn test_progress_url() {
        let api = ApiConfig {
            base_url: "https://coach.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            api.progress_url("plan-1", "client-9"),
            "https://coach.example.com/api/clients/client-9/plans/plan-1/progress"
        );
    }
}
