use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::Color;
use crate::project::{read_json, write_json, ProjectError};

// ── LLM provider types ──────────────────────────────────────────

/// Which reasoning service backs the command interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum LlmProvider {
    Gemini,
    Anthropic,
    OpenAiCompatible,
}

/// Full configuration for the chosen LLM provider.
///
/// The `api_key` field is never written to `settings.json`. It is stored in a
/// separate credentials file and loaded/saved via [`load_api_key`]/[`save_api_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override. Required for self-hosted OpenAI-compatible servers.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model override. None = use provider default.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: None,
            base_url: None,
            model: None,
        }
    }
}

/// Redacted view of the LLM config for display (no raw API key).
#[derive(Debug, Clone, Serialize)]
pub struct LlmConfigInfo {
    pub provider: LlmProvider,
    pub has_api_key: bool,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl LlmConfigInfo {
    #[must_use]
    pub fn from_config(config: &LlmProviderConfig) -> Self {
        Self {
            provider: config.provider,
            has_api_key: config.api_key.as_ref().is_some_and(|k| !k.trim().is_empty()),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }
}

// ── App settings ─────────────────────────────────────────────────

pub const DEFAULT_ASSET_BASE_URL: &str = "/models";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const SETTINGS_VERSION: u32 = 1;

/// Settings stored as `settings.json` in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub version: u32,
    /// Prefix joined with each part's model file in the preview scene document.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Brim color used when the interpreter names a color we don't know.
    #[serde(default)]
    pub fallback_brim_color: Option<String>,
    #[serde(default)]
    pub llm: LlmProviderConfig,
}

fn default_asset_base_url() -> String {
    DEFAULT_ASSET_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            asset_base_url: default_asset_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fallback_brim_color: None,
            llm: LlmProviderConfig::default(),
        }
    }
}

impl AppSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fallback_color(&self) -> Color {
        self.fallback_brim_color
            .as_deref()
            .and_then(Color::parse)
            .unwrap_or(Color::NEUTRAL_GRAY)
    }
}

/// Load the API key from the separate credentials file.
pub fn load_api_key(app_config_dir: &Path) -> Option<String> {
    let path = crate::paths::credentials_path(app_config_dir);
    std::fs::read_to_string(path)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Save the API key to the separate credentials file (atomic write). An empty
/// key removes the file.
pub fn save_api_key(app_config_dir: &Path, key: &str) -> Result<(), ProjectError> {
    std::fs::create_dir_all(app_config_dir)?;
    let path = crate::paths::credentials_path(app_config_dir);
    if key.trim().is_empty() {
        let _ = std::fs::remove_file(&path);
    } else {
        crate::project::atomic_write(&path, key.trim().as_bytes())?;
    }
    Ok(())
}

/// Load settings from the config directory. A missing file yields defaults.
///
/// The API key comes from the `CAPFORGE_API_KEY` environment variable when set,
/// otherwise from the credentials file.
pub fn load_settings(app_config_dir: &Path) -> Result<AppSettings, ProjectError> {
    let path = crate::paths::settings_path(app_config_dir);
    let mut settings = if path.exists() {
        read_json::<AppSettings>(&path)?
    } else {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        AppSettings::default()
    };

    if settings.version > SETTINGS_VERSION {
        tracing::warn!(
            version = settings.version,
            supported = SETTINGS_VERSION,
            "settings file is newer than this build"
        );
    }

    settings.llm.api_key = std::env::var(crate::paths::API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| load_api_key(app_config_dir));

    Ok(settings)
}

/// Save settings to the config directory.
pub fn save_settings(app_config_dir: &Path, settings: &AppSettings) -> Result<(), ProjectError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
