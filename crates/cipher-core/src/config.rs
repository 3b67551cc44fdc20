use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_FILE_PATH: &str = "cipher.toml";

/// Shortest autosave period; smaller values (including 0) are raised to it.
pub const MIN_AUTOSAVE_SECS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash-preview-09-2025".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Top-level namespace of every persisted document.
    pub app_namespace: String,
    /// Externally supplied token for the first sign-in attempt.
    pub bootstrap_token: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub inference: InferenceConfig,
    pub autosave_enabled: bool,
    pub autosave_interval_secs: u64,
    pub simulation_debounce_ms: u64,
    pub status_clear_secs: u64,
    pub retry: RetryConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            app_namespace: "default-app-id".to_string(),
            bootstrap_token: None,
            data_dir: None,
            inference: InferenceConfig::default(),
            autosave_enabled: true,
            autosave_interval_secs: 10,
            simulation_debounce_ms: 1500,
            status_clear_secs: 3,
            retry: RetryConfig::default(),
        }
    }
}

fn cipher_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cipher")
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl StudioConfig {
    /// `~/.cipher/config.json`, else `./cipher.toml`, then the environment.
    pub fn load() -> Self {
        let mut config = Self::from_files(&cipher_dir().join("config.json"), Path::new(CONFIG_FILE_PATH));
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_files(json_path: &Path, toml_path: &Path) -> Self {
        if json_path.exists() {
            match std::fs::read_to_string(json_path).map(|c| serde_json::from_str::<StudioConfig>(&c)) {
                Ok(Ok(config)) => return config,
                Ok(Err(e)) => log::warn!("Ignoring malformed config {:?}: {}", json_path, e),
                Err(e) => log::warn!("Failed to read config {:?}: {}", json_path, e),
            }
        }

        if toml_path.exists() {
            if let Ok(content) = std::fs::read_to_string(toml_path) {
                match toml::from_str::<StudioConfig>(&content) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("Ignoring malformed config {:?}: {}", toml_path, e),
                }
            }
        }

        Self::default()
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup("CIPHER_APP_ID") {
            self.app_namespace = namespace;
        }
        if let Some(token) = lookup("CIPHER_AUTH_TOKEN") {
            self.bootstrap_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(dir) = lookup("CIPHER_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.inference.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(base) = lookup("GEMINI_API_BASE") {
            self.inference.api_base = base;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.inference.model = model;
        }
        if let Some(autosave) = lookup("CIPHER_AUTOSAVE") {
            self.autosave_enabled = parse_bool_env(&autosave);
        }
        if let Some(secs) = lookup("CIPHER_AUTOSAVE_SECS").and_then(|s| s.trim().parse::<u64>().ok()) {
            if secs < MIN_AUTOSAVE_SECS {
                log::warn!("Ignoring CIPHER_AUTOSAVE_SECS={}; must be at least {}", secs, MIN_AUTOSAVE_SECS);
            } else {
                self.autosave_interval_secs = secs;
            }
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(cipher_dir)
    }

    /// Never shorter than [`MIN_AUTOSAVE_SECS`], whatever the file said.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(MIN_AUTOSAVE_SECS))
    }

    pub fn simulation_debounce(&self) -> Duration {
        Duration::from_millis(self.simulation_debounce_ms)
    }

    pub fn status_clear_after(&self) -> Duration {
        Duration::from_secs(self.status_clear_secs)
    }
}
