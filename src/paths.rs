//! Config file location.
//!
//! Resolution order:
//! 1. `-c/--config` (or `LIDARR_SYNC_CONFIG`, read by clap)
//! 2. Platform config dir: `<config dir>/lidarr-sync/config.toml`
//!    - Linux: `~/.config/lidarr-sync/config.toml`
//!    - macOS: `~/Library/Application Support/lidarr-sync/config.toml`
//!    - Windows: `%APPDATA%\lidarr-sync\config.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for the config file override
pub const ENV_CONFIG: &str = "LIDARR_SYNC_CONFIG";

const APP_DIR: &str = "lidarr-sync";
const CONFIG_FILE: &str = "config.toml";

/// Get the config file to load, honoring an explicit override.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand(&path.to_string_lossy());
        log::debug!("Using config file from command line: {}", path.display());
        return Ok(path);
    }

    let dir = dirs::config_dir().context("Could not determine config directory")?;
    let path = dir.join(APP_DIR).join(CONFIG_FILE);
    log::debug!("Using default config file: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/lidarr.toml"), home.join("lidarr.toml"));
    }

    #[test]
    fn test_expand_plain_path_unchanged() {
        assert_eq!(expand("/etc/lidarr.toml"), PathBuf::from("/etc/lidarr.toml"));
    }

    #[test]
    fn test_explicit_config_wins() {
        let path = config_file(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_default_config_file_name() {
        if let Ok(path) = config_file(None) {
            assert!(path.ends_with("lidarr-sync/config.toml"));
        }
    }
}
