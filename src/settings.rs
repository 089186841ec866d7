//! Crate-level settings.
//!
//! Layered like the rest of the ecosystem expects: built-in defaults, then
//! `$XDG_CONFIG_HOME/promptline/config.toml`, then `PROMPTLINE_*` environment
//! variables.

use config::{Config, ConfigError, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Theme activated at startup.
    pub theme: String,
    /// Wall-clock bound for synchronous (prompt-path) git commands, ms.
    #[serde(rename = "git-timeout-ms")]
    pub git_timeout_ms: u64,
    /// Wall-clock bound for async worker git commands, ms.
    #[serde(rename = "async-git-timeout-ms")]
    pub async_git_timeout_ms: u64,
    /// Collect git status on the background worker instead of inline.
    #[serde(rename = "async-git")]
    pub async_git: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            git_timeout_ms: 3000,
            async_git_timeout_ms: 5000,
            async_git: true,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("promptline").join("config.toml"));
        }
    }
    ProjectDirs::from("", "", "promptline").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Settings {
    /// Load settings: defaults, then the config file if present, then
    /// `PROMPTLINE_`-prefixed environment variables.
    pub fn load() -> Result<Settings, ConfigError> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("theme", defaults.theme)?
            .set_default("git-timeout-ms", defaults.git_timeout_ms)?
            .set_default("async-git-timeout-ms", defaults.async_git_timeout_ms)?
            .set_default("async-git", defaults.async_git)?;

        if let Some(path) = config_path() {
            if path.exists() {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("PROMPTLINE").separator("_"));

        builder.build()?.try_deserialize()
    }
}
