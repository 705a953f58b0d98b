//! lambda-lambda - Lambda functions that build and deploy Lambda functions
//!
//! The `bootstrap` binary runs as an AWS Lambda function: it clones a
//! repository, builds its dependency and user layers plus the function
//! package, and points the target function at them. The `lambda-lambda`
//! binary provisions that function and triggers builds.

pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod git;
pub mod handler;
pub mod manifest;
pub mod package;
pub mod provision;
pub mod shell;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DeployError, DeployResult};
