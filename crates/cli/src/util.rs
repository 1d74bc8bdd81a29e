//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sdev_core::config::CONFIG_FILE;
use sdev_core::DevelopConfig;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Find the configuration file
///
/// An explicit path wins; otherwise walk up from cwd to the first `sdev.toml`.
pub fn find_config(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        anyhow::ensure!(path.is_file(), "Configuration file not found: {}", path.display());
        return Ok(path.to_path_buf());
    }

    let mut current = std::env::current_dir().context("Failed to get current directory")?;
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not an sdev project (no {} found)", CONFIG_FILE),
        }
    }
}

/// Locate and load the project configuration
pub fn load_config(explicit: Option<&Path>) -> Result<DevelopConfig> {
    let path = find_config(explicit)?;
    DevelopConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Load configuration for `develop`, folding the `-v` flag into it
pub fn load_develop_config(explicit: Option<&Path>, verbose: bool) -> Result<DevelopConfig> {
    let mut config = load_config(explicit)?;
    config.develop.verbose |= verbose;
    Ok(config)
}

/// Max log level for a run
pub fn log_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the fmt subscriber; called once per process
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_target(false)
        .init();
}
