//! Configuration persistence
//!
//! Stores defaults for sessions and the dispatcher in
//! `~/.config/streamlight/config.yaml`

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration that persists across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamlightConfig {
    /// Theme id used when a session or request names none
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Language used when a session names none
    #[serde(default = "default_language")]
    pub language: String,
    /// Whether streaming sessions may revise emitted tokens
    #[serde(default = "default_allow_recalls")]
    pub allow_recalls: bool,
    /// Base URL of the remote highlight service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Listen address for `streamlight serve`
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Timeout applied by the HTTP client to remote highlight requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_theme() -> String {
    crate::theme::FALLBACK_THEME.to_string()
}

fn default_language() -> String {
    "text".to_string()
}

fn default_allow_recalls() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for StreamlightConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: default_language(),
            allow_recalls: default_allow_recalls(),
            endpoint: default_endpoint(),
            listen: default_listen(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl StreamlightConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    /// Save config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}
