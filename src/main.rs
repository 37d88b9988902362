mod cli;
mod client;
mod commands;
mod config;
mod paths;
mod report;
mod secrets;
mod settings;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub api_key: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        api_key: cli.api_key,
    };

    match cli.command {
        Command::Apply(args) => commands::sync::apply(&ctx, args),
        Command::Diff(args) => commands::sync::diff(&ctx, args),
        Command::Dump { output } => commands::dump::run(&ctx, output.as_deref()),
        Command::Validate => commands::config::validate(&ctx),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "lidarr-sync", &mut io::stdout());
            Ok(())
        }
    }
}
