//! Pagesmith: publish a built static site to GitHub Pages.
//!
//! # Usage
//!
//! ```text
//! pagesmith publish [SOURCE] [--mode branch|directory] [--branch <name>] [--dir <path>]
//!                   [--remote <url>] [--message <msg>] [--repo <path>] [--config <file>]
//! pagesmith config [--repo <path>] [--config <file>]
//! pagesmith init [--repo <path>]
//! ```
//!
//! Two runs against the same branch or directory at once are not
//! coordinated; the later push wins.

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

use commands::{config::ConfigArgs, init::InitArgs, publish::PublishArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pagesmith",
    version,
    about = "Publish a built static site to a gh-pages branch or a docs directory",
    long_about = None,
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the artifact directory onto the publish target, commit and push.
    Publish(PublishArgs),

    /// Print the effective configuration as YAML.
    Config(ConfigArgs),

    /// Write a default .pagesmith.yaml into the repository.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Publish(args) => args.run(),
        Commands::Config(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
