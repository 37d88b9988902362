//! Connection details for one Lidarr instance.

use crate::config::LidarrConfig;
use anyhow::{Result, bail};
use std::fmt;

/// Environment variable for the API key
pub const ENV_API_KEY: &str = "LIDARR_API_KEY";

/// Base URL and API key used for every request.
#[derive(Clone)]
pub struct LidarrSecrets {
    pub base_url: String,
    pub api_key: String,
}

impl LidarrSecrets {
    /// Build from config; an API key given on the command line or through
    /// the environment takes precedence over the file.
    pub fn from_config(config: &LidarrConfig, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key
            .or(config.api_key.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let Some(api_key) = api_key else {
            bail!("No API key configured: set lidarr.api_key or {ENV_API_KEY}");
        };

        Ok(Self {
            base_url: base_url(config),
            api_key: api_key.to_string(),
        })
    }
}

// Keep the API key out of debug output.
impl fmt::Debug for LidarrSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LidarrSecrets")
            .field("base_url", &self.base_url)
            .field("api_key", &"********")
            .finish()
    }
}

fn base_url(config: &LidarrConfig) -> String {
    let url_base = config
        .url_base
        .as_deref()
        .map(|base| base.trim_matches('/'))
        .filter(|base| !base.is_empty())
        .map(|base| format!("/{base}"))
        .unwrap_or_default();
    format!(
        "{}://{}:{}{url_base}",
        config.protocol, config.hostname, config.port
    )
}
