use crate::{paths, secrets};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lidarr-sync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep a Lidarr instance's settings in sync with a config file", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/lidarr-sync/config.toml)
    #[arg(short, long, global = true, env = paths::ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Lidarr API key, overriding lidarr.api_key
    #[arg(long, global = true, env = secrets::ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply the config to Lidarr
    Apply(ApplyArgs),

    /// Show what apply would change, without changing anything
    Diff(DiffArgs),

    /// Print Lidarr's current settings as a config file
    Dump {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the config file without contacting Lidarr
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub diff: DiffArgs,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Also enforce defaults for settings the config does not mention
    #[arg(long)]
    pub check_unmanaged: bool,

    /// Disable colored output
    #[arg(long)]
    pub plain: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from(["lidarr-sync", "-vv", "apply", "--yes", "--check-unmanaged"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.yes);
                assert!(!args.dry_run);
                assert!(args.diff.check_unmanaged);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["lidarr-sync", "diff", "-c", "/tmp/lidarr.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lidarr.toml")));
    }
}
