//! CLI command implementations

pub mod build;
pub mod config;
pub mod setup;

pub use build::execute as build;
pub use config::execute as config;
pub use setup::execute as setup;
