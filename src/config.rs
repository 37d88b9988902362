//! `config.toml` loading and validation.
//!
//! ```toml
//! [lidarr]
//! hostname = "localhost"
//! port = 8686
//! api_key = "..."
//!
//! [lidarr.settings.general.logging]
//! log_level = "DEBUG"
//!
//! [lidarr.settings.tags]
//! definitions = ["flac", "vinyl"]
//! ```

use crate::settings::{Invalid, LidarrSettings, TREE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub lidarr: LidarrConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

/// Connection to one Lidarr instance and its desired settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LidarrConfig {
    pub hostname: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Path prefix when Lidarr sits behind a reverse proxy
    pub url_base: Option<String>,
    /// Also settable through `LIDARR_API_KEY`
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Enforce defaults for settings the config does not mention
    pub check_unmanaged: bool,
    pub settings: LidarrSettings,
}

impl Default for LidarrConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 8686,
            protocol: Protocol::Http,
            url_base: None,
            api_key: None,
            timeout_secs: 30,
            check_unmanaged: false,
            settings: LidarrSettings::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Every problem with the config, connection settings first.
    pub fn validate(&self) -> Vec<Invalid> {
        let lidarr = &self.lidarr;
        let mut errors = Vec::new();

        if lidarr.hostname.trim().is_empty() {
            errors.push(Invalid::new("lidarr.hostname", "must not be empty"));
        }
        if lidarr.port == 0 {
            errors.push(Invalid::new("lidarr.port", "port must be 1-65535"));
        }
        if lidarr.timeout_secs == 0 {
            errors.push(Invalid::new("lidarr.timeout_secs", "must be at least 1"));
        }

        errors.extend(lidarr.settings.validate(TREE));
        errors
    }
}
