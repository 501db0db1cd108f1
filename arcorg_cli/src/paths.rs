//! Centralized path management for the arcorg CLI

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "arcorg";

/// Default manifest file, relative to the working directory
pub const DEFAULT_MANIFEST_FILE: &str = "arcorg.toml";

/// Default state file, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "arcorg.state.json";

/// Returns the path to the configuration directory
///
/// On Unix-like systems this honours `XDG_CONFIG_HOME`, then falls back to
/// the platform config directory (`~/.config/arcorg` on Linux).
///
/// If no standard directory can be determined, falls back to `.arcorg` in the
/// current directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".arcorg"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}
