pub mod config;
pub mod dump;
pub mod sync;

use anyhow::{Result, bail};
use std::path::PathBuf;
use std::time::Duration;

use crate::Context;
use crate::client::HttpClient;
use crate::config::{Config, LidarrConfig};
use crate::paths;
use crate::secrets::LidarrSecrets;
use crate::ui;

/// Resolve, load and validate the config file.
pub fn load_config(ctx: &Context) -> Result<(PathBuf, Config)> {
    let path = paths::config_file(ctx.config.as_deref())?;
    log::debug!("Loading config from {}", path.display());
    let config = Config::load(&path)?;

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            ui::error(&error.to_string());
        }
        bail!("{} has {} invalid setting(s)", path.display(), errors.len());
    }
    Ok((path, config))
}

/// HTTP client for the configured instance.
pub fn connect(ctx: &Context, lidarr: &LidarrConfig) -> Result<HttpClient> {
    let secrets = LidarrSecrets::from_config(lidarr, ctx.api_key.as_deref())?;
    log::info!("Connecting to {}", secrets.base_url);
    Ok(HttpClient::new(secrets, Duration::from_secs(lidarr.timeout_secs)))
}
