//! Reallocation planner CLI - plan, inspect bounds and check configs offline.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{run_bounds, run_check_config, run_plan};

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Plan(args) => {
            run_plan(&args, cli.format).await?;
        }
        Commands::Bounds(args) => {
            run_bounds(&args, cli.format)?;
        }
        Commands::CheckConfig(args) => {
            run_check_config(&args, cli.format)?;
        }
    }

    Ok(())
}
