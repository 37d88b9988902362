use anyhow::{Context as AnyhowContext, Result};
use reconcile::SettingsGroup;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::commands::{connect, load_config};
use crate::settings::LidarrSettings;
use crate::ui;

#[derive(Serialize)]
struct Dump<'a> {
    lidarr: DumpLidarr<'a>,
}

#[derive(Serialize)]
struct DumpLidarr<'a> {
    settings: &'a LidarrSettings,
}

/// Render remote settings as a config file fragment.
pub fn render(settings: &LidarrSettings) -> Result<String> {
    let dump = Dump {
        lidarr: DumpLidarr { settings },
    };
    toml::to_string_pretty(&dump).context("Failed to serialize settings")
}

pub fn run(ctx: &Context, output: Option<&Path>) -> Result<()> {
    let (_, config) = load_config(ctx)?;
    let client = connect(ctx, &config.lidarr)?;
    let settings =
        LidarrSettings::from_remote(&client).context("Failed to read settings from Lidarr")?;
    let content = render(&settings)?;

    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Could not write {}", path.display()))?;
            if !ctx.quiet {
                ui::success(&format!("Wrote {}", path.display()));
            }
        }
        None => print!("{content}"),
    }
    Ok(())
}
