//! `apply` and `diff`: reconcile the config against a live instance.

use anyhow::{Context as AnyhowContext, Result};
use dialoguer::Confirm;
use reconcile::{ApplyContext, LogSink};

use crate::Context;
use crate::cli::{ApplyArgs, DiffArgs};
use crate::client::HttpClient;
use crate::commands::{connect, load_config};
use crate::config::Config;
use crate::report::ConsoleSink;
use crate::settings;
use crate::ui;

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    if args.diff.plain {
        colored::control::set_override(false);
    }
    let (_, config) = load_config(ctx)?;
    let client = connect(ctx, &config.lidarr)?;
    let check_unmanaged = args.diff.check_unmanaged || config.lidarr.check_unmanaged;

    let changes = preview(ctx, &config, &client, check_unmanaged)?;
    if changes == 0 {
        ui::success("Lidarr is up to date");
        return Ok(());
    }
    if args.dry_run {
        ui::info(&format!("Dry run: {} not applied", ui::changes(changes)));
        return Ok(());
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Apply {} to {}?", ui::changes(changes), client.base_url()))
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    // The plan was already printed; the real pass only logs.
    let sink = LogSink;
    let apply_ctx = ApplyContext::new(&client, &sink, false);
    settings::sync(&config.lidarr.settings, &apply_ctx, check_unmanaged)?;
    ui::success(&format!("Applied {}", ui::changes(changes)));
    Ok(())
}

pub fn diff(ctx: &Context, args: DiffArgs) -> Result<()> {
    if args.plain {
        colored::control::set_override(false);
    }
    let (_, config) = load_config(ctx)?;
    let client = connect(ctx, &config.lidarr)?;
    let check_unmanaged = args.check_unmanaged || config.lidarr.check_unmanaged;

    let changes = preview(ctx, &config, &client, check_unmanaged)?;
    if changes == 0 {
        ui::success("Lidarr is up to date");
    } else {
        ui::info(&format!("{} pending", ui::changes(changes)));
    }
    Ok(())
}

/// Dry-run pass that prints the plan and returns the number of changes.
fn preview(
    ctx: &Context,
    config: &Config,
    client: &HttpClient,
    check_unmanaged: bool,
) -> Result<usize> {
    if !ctx.quiet {
        ui::header(&format!("Lidarr at {}", client.base_url()));
    }
    let sink = ConsoleSink::new(ctx.verbose > 0);
    let preview = ApplyContext::dry_run(client, &sink);
    settings::sync(&config.lidarr.settings, &preview, check_unmanaged)
        .context("Failed to compare settings with Lidarr")?;
    Ok(sink.changes())
}
