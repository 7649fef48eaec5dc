//! Command implementations for the Tally CLI

pub mod check_config;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_config::Config;

/// Load configuration
///
/// An explicit path must exist. Without one, `configs/config.toml` and
/// `config.toml` are tried before falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let default_paths = [
        PathBuf::from("configs/config.toml"),
        PathBuf::from("config.toml"),
    ];
    for path in &default_paths {
        if path.exists() {
            return Config::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()));
        }
    }

    Ok(Config::default())
}
