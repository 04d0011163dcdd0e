//! Centralized path definitions for all data files and directories.
//!
//! This module is the single source of truth for leaf filenames and directory
//! names. No other module should hard-code these strings.

use std::path::{Path, PathBuf};

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const CREDENTIALS_FILE: &str = ".credentials";
pub const DEFAULT_SCRIPT_FILE: &str = "build_cap.py";

// ── Directory names ──────────────────────────────────────────────

pub const DEFAULT_CONFIG_DIR: &str = ".capforge";
/// Subfolder, next to the emitted script, that holds the 3D model files.
pub const MODELS_DIR: &str = "models";

// ── Environment ──────────────────────────────────────────────────

pub const API_KEY_ENV: &str = "CAPFORGE_API_KEY";

// ── Config-dir functions (take app_config_dir) ───────────────────

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

pub fn credentials_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(CREDENTIALS_FILE)
}

pub fn default_config_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_DIR)
}
