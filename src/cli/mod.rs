//! Command-line interface for the operator

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
