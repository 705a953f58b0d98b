//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// lambda-lambda - Lambda functions that build and deploy Lambda functions
///
/// Provisions a bootstrapper function in your AWS account and asks it to
/// build repositories into layers and function packages.
#[derive(Parser, Debug)]
#[command(name = "lambda-lambda")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LAMBDA_LAMBDA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the bootstrapper function and build its git layer
    Setup(SetupArgs),

    /// Ask the bootstrapper to build and deploy a repository
    Build(BuildArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the setup command
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// S3 bucket for storing deployment packages
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Name of the bootstrapper function [default: lambda-lambda-lambda]
    #[arg(short, long)]
    pub function: Option<String>,

    /// AWS region of the bootstrapper (defaults to the SDK's region)
    #[arg(long)]
    pub region: Option<String>,

    /// Path of the built `bootstrap` executable (defaults to the one next to this binary)
    #[arg(long)]
    pub binary: Option<PathBuf>,

    /// Function timeout in seconds
    #[arg(long)]
    pub timeout: Option<i32>,

    /// Function memory in MB
    #[arg(long)]
    pub memory: Option<i32>,

    /// Do not ask before creating resources
    #[arg(short, long)]
    pub yes: bool,

    /// Provision only; skip the setup invocation
    #[arg(long)]
    pub skip_invoke: bool,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Function to deploy
    #[arg(short, long)]
    pub function: String,

    /// Repository to build, owned by the configured git username
    #[arg(short, long)]
    pub repo: String,

    /// Branch to check out
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Manifest path inside the repository
    #[arg(long)]
    pub build_file: Option<String>,

    /// Component to build: dependencies, function, or a layer name (repeatable)
    #[arg(long = "component", value_name = "NAME")]
    pub components: Vec<String>,

    /// Publish a new version after updating code
    #[arg(long)]
    pub version: bool,

    /// Alias to create or move to the new code
    #[arg(long)]
    pub alias: Option<String>,

    /// Bootstrapper function to invoke [default: from config]
    #[arg(long)]
    pub bootstrapper: Option<String>,

    /// AWS region of the bootstrapper
    #[arg(long)]
    pub region: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (token masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., github.git_username)
        key: String,
        /// Value to set
        value: String,
    },
}
