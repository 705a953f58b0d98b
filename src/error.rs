//! Error types for lambda-lambda
//!
//! All modules use `DeployResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for deployment operations
pub type DeployResult<T> = Result<T, DeployError>;

/// All errors that can occur while provisioning or deploying
#[derive(Error, Debug)]
pub enum DeployError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown config key: {0}")]
    ConfigKey(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("No deploy bucket configured")]
    MissingBucket,

    // Invocation errors
    #[error("Invalid invocation event: {0}")]
    EventInvalid(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invocation event is missing required field: {0}")]
    MissingField(&'static str),

    // Manifest errors
    #[error("Unsupported build file format: {0}")]
    ManifestFormat(PathBuf),

    #[error("Invalid build manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // Source control errors
    #[error("Failed to clone {url}: {reason}")]
    GitClone { url: String, reason: String },

    #[error("Failed to pull {url}: {reason}")]
    GitPull { url: String, reason: String },

    // Cloud API errors
    #[error("Failed to {operation}: {reason}")]
    Aws { operation: String, reason: String },

    #[error("{operation} response is missing {field}")]
    MissingResponseField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Cannot find ARN for IAM role {0}")]
    RoleNotFound(String),

    #[error("Function {name} did not become ready: {state}")]
    FunctionNotReady { name: String, state: String },

    #[error("Remote build failed with status {status}: {body}")]
    RemoteBuild { status: u16, body: String },

    // Packaging errors
    #[error("Failed to write archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}: {detail}")]
    CommandExecution { command: String, detail: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl DeployError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Create a cloud API error for the named operation
    pub fn aws(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Aws {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP-style status code reported back to the invoker
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EventInvalid(_)
            | Self::UnknownAction(_)
            | Self::MissingField(_)
            | Self::ManifestFormat(_)
            | Self::ManifestInvalid { .. } => 400,
            _ => 500,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingBucket => Some("Pass --bucket or run: lambda-lambda config set deploy.bucket <name>"),
            Self::MissingEnv(_) => Some("Re-run: lambda-lambda setup to refresh the function environment"),
            Self::RoleNotFound(_) => Some("Check that your AWS identity may call iam:GetRole and iam:CreateRole"),
            Self::FunctionNotReady { .. } => Some("Check the function in the Lambda console, then retry"),
            Self::ManifestFormat(_) => Some("Build files must end in .yaml, .yml or .json"),
            _ => None,
        }
    }
}
