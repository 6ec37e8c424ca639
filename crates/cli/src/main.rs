//! issuewright CLI: the main entry point.
//!
//! Commands:
//! - `run`     Run a rule script against one webhook payload
//! - `check`   Parse a script and list its rules
//! - `config`  Show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "issuewright",
    about = "issuewright: rule scripts for issue-tracker events",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a rule script against a webhook payload
    Run(commands::run::RunArgs),

    /// Parse a script file and list its rules and includes
    Check {
        /// Script file to check
        script: PathBuf,
    },

    /// Show the effective configuration (token redacted)
    Config {
        /// Print the default configuration as TOML instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Check { script } => commands::check::run(&script).await?,
        Commands::Config { default } => commands::config_cmd::show(default).await?,
    }

    Ok(())
}
