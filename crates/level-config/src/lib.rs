mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const APP_DIR: &str = "bubble-level";
const CONFIG_FILE: &str = "config.toml";

/// `<user config dir>/bubble-level/config.toml`, creating the directory.
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join(APP_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    Ok(dir.join(CONFIG_FILE))
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &config_path()?)
}

/// Read `path`, falling back to defaults when it doesn't exist.
///
/// Calibration offsets are runtime state and never appear here.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!(?path, "No config found, using defaults");
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("Invalid config at {}", path.display()))?;
    info!(?path, "Loaded config");
    Ok(config)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    info!(?path, "Saved config");
    Ok(())
}
