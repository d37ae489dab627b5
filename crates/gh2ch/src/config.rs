//! Token persistence in `~/.github-clubhouse`.
//!
//! The config file is plain JSON. A missing file loads as an empty config so
//! first runs with explicit `--github-token`/`--clubhouse-token` flags just
//! work.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".github-clubhouse";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clubhouse_token: Option<String>,
    /// GitHub login → Clubhouse username overrides, applied before member
    /// lookup during import.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_mappings: HashMap<String, String>,
}

/// Default config path: `~/.github-clubhouse`.
pub fn config_path() -> Result<PathBuf, String> {
    home::home_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or_else(|| "could not determine home directory".to_string())
}

pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => return Err(format!("failed to read config '{}': {e}", path.display())),
    };
    serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse config '{}': {e}", path.display()))
}

pub fn save_config(config: &Config) -> Result<(), String> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("failed to serialize config: {e}"))?;
    std::fs::write(path, content)
        .map_err(|e| format!("failed to write config '{}': {e}", path.display()))
}
