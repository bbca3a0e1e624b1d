//! saga - Entry point
//!
//! Usage: saga [<repo> [entries..] [args..] | tree | update | clone | config]

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sagacity::cli::{Cli, Commands};
use sagacity::config::Config;
use sagacity::core::exec::Outcome;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config_path = cli.config_path()?;
    let mut config = Config::load_from(&config_path)?;

    let outcome = match cli.command {
        None => sagacity::cli::run_list(&config).await?,
        Some(Commands::Repo(tokens)) => sagacity::cli::run_repo(tokens, &config, cli.yes).await?,
        Some(Commands::Tree(args)) => {
            sagacity::cli::tree::run(args, &config).await?;
            Outcome::Listed
        }
        Some(Commands::Update(args)) => {
            sagacity::cli::update::run_update(args, &config).await?;
            Outcome::Listed
        }
        Some(Commands::Clone(args)) => {
            sagacity::cli::update::run_clone(args, &mut config, &config_path)?;
            Outcome::Listed
        }
        Some(Commands::Config(args)) => {
            sagacity::cli::config::run(args, &config_path)?;
            Outcome::Listed
        }
    };

    Ok(exit_code(outcome))
}

fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Listed => ExitCode::SUCCESS,
        Outcome::Ran(status) => match status.code() {
            Some(0) => ExitCode::SUCCESS,
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            None => ExitCode::FAILURE,
        },
        Outcome::Cancelled => {
            println!("Doing nothing.");
            ExitCode::FAILURE
        }
    }
}
