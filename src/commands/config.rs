use anyhow::Result;

use crate::Context;
use crate::commands::load_config;
use crate::ui;

/// Check the config file without touching the network.
pub fn validate(ctx: &Context) -> Result<()> {
    let (path, config) = load_config(ctx)?;
    if !ctx.quiet {
        ui::success(&format!("{} is valid", path.display()));
        let lidarr = &config.lidarr;
        ui::kv(
            "Instance",
            &format!("{}://{}:{}", lidarr.protocol, lidarr.hostname, lidarr.port),
        );
        ui::kv("Tags", &lidarr.settings.tags.definitions.len().to_string());
    }
    Ok(())
}
