//! Configuration file discovery for the CLI

use anyhow::{Context, Result};
use spot_engine::EngineConfig;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "spotctl";
const CONFIG_FILE: &str = "config.toml";
const CATALOG_FILE: &str = "catalog.json";

/// Load the engine configuration from `explicit`, or from the default
/// location when that file exists. Environment overrides always apply.
pub fn load_engine_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    EngineConfig::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("Failed to load configuration from {}", p.display()),
        None => "Failed to load configuration".to_string(),
    })
}

/// Resolve the catalog snapshot to use
pub fn catalog_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let path = app_dir()
        .map(|dir| dir.join(CATALOG_FILE))
        .context("Could not determine config directory")?;
    if !path.exists() {
        anyhow::bail!(
            "No catalog given and {} does not exist; pass --catalog <FILE>",
            path.display()
        );
    }
    Ok(path)
}

pub fn default_config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(CONFIG_FILE))
}

fn app_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join(APP_DIR))
}
