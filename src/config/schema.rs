//! Configuration schema for the operator CLI
//!
//! Configuration is stored at `~/.config/lambda-lambda/config.toml`

use serde::{Deserialize, Serialize};

/// Default name of the bootstrapper function and its IAM role
pub const DEFAULT_FUNCTION_NAME: &str = "lambda-lambda-lambda";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Source control credentials handed to the bootstrapper
    pub github: GithubConfig,

    /// Defaults for `setup` and `build`
    pub deploy: DeployConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// GitHub settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Commit email
    pub git_email: Option<String>,

    /// Personal access token used for private repositories
    pub git_token: Option<String>,

    /// Account that owns the repositories being deployed
    pub git_username: Option<String>,
}

impl GithubConfig {
    /// Apply `GIT_EMAIL`, `GIT_TOKEN` and `GIT_USERNAME` overrides
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(email) = non_empty("GIT_EMAIL") {
            self.git_email = Some(email);
        }
        if let Some(token) = non_empty("GIT_TOKEN") {
            self.git_token = Some(token);
        }
        if let Some(username) = non_empty("GIT_USERNAME") {
            self.git_username = Some(username);
        }
        self
    }

    /// Environment variables set on the bootstrapper function
    pub fn function_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("git_email", self.git_email.clone().unwrap_or_default()),
            ("git_token", self.git_token.clone().unwrap_or_default()),
            ("git_username", self.git_username.clone().unwrap_or_default()),
        ]
    }
}

/// Deployment defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// S3 bucket for deployment packages
    pub bucket: Option<String>,

    /// Name of the bootstrapper function
    pub function: String,

    /// AWS region of the bootstrapper
    pub region: Option<String>,

    /// Function timeout in seconds
    pub timeout_secs: i32,

    /// Function memory in MB
    pub memory_mb: i32,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            function: DEFAULT_FUNCTION_NAME.to_string(),
            region: None,
            timeout_secs: 60,
            memory_mb: 2048,
        }
    }
}
