//! Configuration directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/gitdiff/`
//! - macOS: `~/Library/Application Support/gitdiff/`
//! - Windows: `%APPDATA%\gitdiff\`

use std::path::PathBuf;

const APP_NAME: &str = "gitdiff";

/// Get the application config directory, without creating it
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME))
}

/// Get path to app config file
pub fn app_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
