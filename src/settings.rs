//! Persisted preferences for the chat client.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.
//!
//! Credentials are never written here; they come from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::chat::Mode;
use crate::model::{ClientConfig, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Language code ("ko" or "en")
    pub lang: String,
    /// Start in online (Bedrock) mode
    pub online: bool,
    /// Bedrock Runtime endpoint override (empty for the regional default)
    pub endpoint: String,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            lang: "ko".to_string(),
            online: false,
            endpoint: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bedrock-chat")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        let mut loaded: Self = Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| Self::from_json(&content))
            .unwrap_or_default();

        // Backfill fields that older files may have zeroed
        if loaded.lang.is_empty() {
            loaded.lang = Self::default().lang;
        }
        if loaded.request_timeout_secs == 0 {
            loaded.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }

        loaded
    }

    fn from_json(content: &str) -> Option<Self> {
        match serde_json::from_str(content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings file: {}", e);
                None
            }
        }
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// Apply `CHAT_LANG`, `CHAT_ONLINE`, `BEDROCK_ENDPOINT` and
    /// `BEDROCK_TIMEOUT_SECS` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(lang) = env::var("CHAT_LANG") {
            self.lang = lang.to_lowercase();
        }
        if let Ok(online) = env::var("CHAT_ONLINE") {
            self.online = online == "1" || online.to_lowercase() == "true";
        }
        if let Ok(endpoint) = env::var("BEDROCK_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(secs) = env::var("BEDROCK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.request_timeout_secs = secs;
        }
        self
    }

    /// Copy the session's language and mode onto these settings.
    ///
    /// Call this on the values loaded from disk, not on the env-merged ones,
    /// so environment overrides never end up in `settings.json`.
    pub fn with_session_prefs(mut self, lang: &str, mode: Mode) -> Self {
        self.lang = lang.to_string();
        self.online = mode == Mode::Online;
        self
    }

    /// Initial chat mode.
    pub fn mode(&self) -> Mode {
        if self.online {
            Mode::Online
        } else {
            Mode::Offline
        }
    }

    /// Connection options for the Bedrock client.
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::default().with_request_timeout(self.request_timeout_secs);
        if self.endpoint.trim().is_empty() {
            config
        } else {
            config.with_endpoint(self.endpoint.trim())
        }
    }
}
