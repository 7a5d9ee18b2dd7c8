use crate::Config;

use anyhow::{Context, Result};
use log::{error, info};
use std::fs;

/// Loads the TOML configuration, falling back to built-in defaults when no
/// path is given.
pub fn load_config(path: &str) -> Result<Config> {
    if path.is_empty() {
        info!("No configuration file given, using built-in defaults.");
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path))?;
    let config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse configuration file: {}", path))?;
    Ok(config)
}

pub fn load_banner(path: &str) -> Result<String> {
    let banner = fs::read_to_string(path)
        .map_err(|e| {
            error!("Failed to read banner file: {}: {}", path, e);
            anyhow::Error::new(e)
        })
        .with_context(|| format!("Failed to read banner file: {}", path))?;

    if banner.trim().is_empty() {
        error!("Banner file is empty: {}", path);
        return Err(anyhow::Error::msg("Banner file is empty."));
    }

    // The banner is a single protocol line; keep the first line only.
    Ok(banner.lines().next().unwrap_or_default().to_string())
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!("  Listen Address: {}", config.server.listen_addr);
    info!("  Listen Port: {}", config.server.listen_port);
    info!("  Shared Root: {}", config.server.shared_root);
    info!(
        "  Upload Buffer Size: {} KB",
        config.upload_chunk() / 1024
    );
    info!(
        "  Download Buffer Size: {} KB",
        config.download_chunk() / 1024
    );
}

/// The one-line welcome banner sent on accept.
pub fn banner_line(config: &Config) -> String {
    match &config.server.banner_file {
        Some(path) => load_banner(path)
            .unwrap_or_else(|_| crate::constants::DEFAULT_BANNER.to_string()),
        None => crate::constants::DEFAULT_BANNER.to_string(),
    }
}
