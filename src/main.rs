//! lambda-lambda - Lambda functions that build and deploy Lambda functions
//!
//! Operator CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use lambda_lambda::cli::{commands, Cli, Commands};
use lambda_lambda::config::{Config, ConfigManager};
use lambda_lambda::error::DeployResult;
use lambda_lambda::ui;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DeployResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());
    ui::init_theme();

    match cli.command {
        Commands::Setup(args) => commands::setup(args, &config).await,
        Commands::Build(args) => commands::build(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("lambda_lambda=warn"),
        1 => EnvFilter::new("lambda_lambda=info"),
        _ => EnvFilter::new("lambda_lambda=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }
}
