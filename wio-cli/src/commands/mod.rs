//! CLI command implementations

pub mod config;
pub mod scrape;
pub mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use wio_core::config::Config;

/// Get the wio directory from `WIO_DIR` or default to `~/.wio`
pub fn get_wio_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WIO_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".wio"))
        .context("Could not find home directory; set WIO_DIR")
}

/// Load the effective configuration
pub fn load_config() -> Result<Config> {
    let wio_dir = get_wio_dir()?;
    Config::load(&wio_dir)
        .with_context(|| format!("Failed to load configuration from {}", wio_dir.display()))
}
