//! Bootstrapper settings read from the Lambda environment

use crate::config::schema::DEFAULT_FUNCTION_NAME;
use crate::error::{DeployError, DeployResult};
use std::path::PathBuf;

/// Settings of the running bootstrapper function
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Bucket that receives function packages
    pub deploy_bucket: String,
    /// Account owning the repositories to deploy
    pub git_username: Option<String>,
    /// Token for private repositories
    pub git_token: Option<String>,
    pub git_email: Option<String>,
    pub region: Option<String>,
    /// Name of this bootstrapper function
    pub bootstrapper: String,
    /// Runtime identifier of this function, e.g. `python3.12`
    pub runtime: Option<String>,
    /// Ephemeral working directory
    pub scratch_dir: PathBuf,
    /// pip executable used for dependency installs
    pub pip_command: String,
}

impl HandlerConfig {
    /// Read settings from the process environment
    pub fn from_env() -> DeployResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DeployResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let deploy_bucket =
            get("deploy_bucket").ok_or_else(|| DeployError::MissingEnv("deploy_bucket".into()))?;

        let runtime = get("AWS_EXECUTION_ENV")
            .map(|env| env.trim_start_matches("AWS_Lambda_").to_string())
            .filter(|rt| !rt.is_empty());

        Ok(Self {
            deploy_bucket,
            git_username: get("git_username"),
            git_token: get("git_token"),
            git_email: get("git_email"),
            region: get("AWS_REGION"),
            bootstrapper: get("AWS_LAMBDA_FUNCTION_NAME")
                .unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_string()),
            runtime,
            scratch_dir: get("scratch_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp")),
            pip_command: get("pip_command").unwrap_or_else(|| "pip".to_string()),
        })
    }

    /// Staging directory for the archive being assembled
    pub fn build_dir(&self) -> PathBuf {
        self.scratch_dir.join("build")
    }

    /// Checkout directory of a repository
    pub fn repo_dir(&self, repo_name: &str) -> PathBuf {
        self.scratch_dir.join(repo_name)
    }

    /// Git username, required for builds
    pub fn require_username(&self) -> DeployResult<&str> {
        self.git_username
            .as_deref()
            .ok_or_else(|| DeployError::MissingEnv("git_username".into()))
    }
}
