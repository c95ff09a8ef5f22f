use crate::profile::ProfileName;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "overkill",
    about = "Raspberry Pi 5 media-center configurator - profiles, overclocking, rollback",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Operate on an alternate filesystem root (staged images, tests)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect system facts and check the appliance baseline
    Detect,

    /// List available overclock profiles
    Profiles,

    /// Apply a profile to the boot, kernel, and thermal configuration
    Apply {
        /// Profile to apply
        profile: ProfileName,

        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show whether applied sections are still intact
    Status,

    /// Restore mutated files to their pristine pre-overkill state
    Rollback {
        /// Restore only this file instead of everything recorded
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the mutation transaction log
    Log,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (auto-detected if omitted)
        shell: Option<Shell>,
    },
}

/// Print shell completions to stdout.
pub fn print_completions(shell: Option<Shell>) {
    let shell = shell.or_else(Shell::from_env).unwrap_or_else(|| {
        eprintln!(
            "Could not detect shell. Specify one: overkill completions bash|zsh|fish|elvish|powershell"
        );
        std::process::exit(1);
    });
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "overkill",
        &mut std::io::stdout(),
    );
}
