//! Centralized configuration paths for streamlight
//!
//! All config files live under:
//! - Unix/macOS: `~/.config/streamlight/`
//! - Windows: `%APPDATA%\streamlight\`

use std::{
    env, fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "streamlight";

/// Base config directory
///
/// Unix/macOS:
///   - If XDG_CONFIG_HOME is set: `$XDG_CONFIG_HOME/streamlight`
///   - Else: `~/.config/streamlight`
///
/// Windows:
///   - `%APPDATA%\streamlight`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `~/.config/streamlight/themes/`
pub fn themes_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("themes"))
}

/// `~/.config/streamlight/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `~/.config/streamlight/logs/`
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

/// Create the logs directory if needed and return it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let dir = logs_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))
}
