//! Config loader — reads `~/.pairbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.pairbot/config.json`
//! 3. Environment variables `PAIRBOT_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be
/// parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `PAIRBOT_<SECTION>__<FIELD>` (double underscore as
/// delimiter). `OPENAI_API_KEY` and `BRAVE_API_KEY` are honored as
/// conventional fallbacks when the config leaves the keys empty.
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(model) = std::env::var("PAIRBOT_AGENT__MODEL") {
        config.agent.model = model;
    }
    if let Ok(workspace) = std::env::var("PAIRBOT_AGENT__WORKSPACE") {
        config.agent.workspace = workspace;
    }
    if let Ok(val) = std::env::var("PAIRBOT_AGENT__MAX_ITERATIONS") {
        if let Ok(n) = val.parse() {
            config.agent.max_iterations = n;
        }
    }
    if let Ok(key) = std::env::var("PAIRBOT_PROVIDER__API_KEY") {
        config.provider.api_key = key;
    }
    if let Ok(base) = std::env::var("PAIRBOT_PROVIDER__API_BASE") {
        config.provider.api_base = base;
    }
    if let Ok(key) = std::env::var("PAIRBOT_TOOLS__SEARCH_API_KEY") {
        config.tools.search_api_key = key;
    }

    // Conventional fallbacks
    if config.provider.api_key.is_empty() {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.provider.api_key = key;
        }
    }
    if config.tools.search_api_key.is_empty() {
        if let Ok(key) = std::env::var("BRAVE_API_KEY") {
            config.tools.search_api_key = key;
        }
    }

    config
}
