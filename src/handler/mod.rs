//! Invocation handling for the bootstrapper function
//!
//! Each invocation is dispatched on its action string. `setup` builds the
//! git-client layer for the bootstrapper; `build` clones a repository and
//! deploys the selected components. Domain failures never escape as runtime
//! errors: they become `{statusCode, body}` responses.

mod build;
pub mod layers;
mod setup;

pub use build::BuildSummary;

use crate::aws::{FunctionApi, ObjectStore, WaitPolicy};
use crate::config::HandlerConfig;
use crate::error::DeployResult;
use crate::event::{Action, InvocationEvent, Response};
use crate::git::GitClient;
use std::sync::Arc;
use tracing::{error, info};

/// Layer holding the git client for the bootstrapper
pub const BUILD_ENV_LAYER: &str = "build-env";

/// License of the `build-env` layer contents
pub const BUILD_ENV_LICENSE: &str = "Apache-2.0/GPL-2.0-or-later/MIT";

/// Archive name of function packages, locally and in the bucket
pub const FUNCTION_ARCHIVE: &str = "lambda_function.zip";

/// Runs setup and build actions against the configured services
pub struct Deployer {
    config: HandlerConfig,
    functions: Arc<dyn FunctionApi>,
    store: Arc<dyn ObjectStore>,
    git: Arc<dyn GitClient>,
    update_wait: WaitPolicy,
}

impl Deployer {
    pub fn new(
        config: HandlerConfig,
        functions: Arc<dyn FunctionApi>,
        store: Arc<dyn ObjectStore>,
        git: Arc<dyn GitClient>,
    ) -> Self {
        Self {
            config,
            functions,
            store,
            git,
            update_wait: WaitPolicy::default(),
        }
    }

    /// Limits for waiting on each layer or code update to settle
    pub fn with_update_wait(mut self, policy: WaitPolicy) -> Self {
        self.update_wait = policy;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle one invocation payload
    pub async fn handle(&self, payload: serde_json::Value) -> Response {
        match self.dispatch(payload).await {
            Ok(()) => Response::success(),
            Err(e) => {
                error!("{}", e);
                Response::from_error(&e)
            }
        }
    }

    async fn dispatch(&self, payload: serde_json::Value) -> DeployResult<()> {
        let event = InvocationEvent::from_value(payload)?;
        info!(function = %event.function, action = %event.action, "Received invocation");

        match Action::parse(&event.action)? {
            Action::Setup => {
                let arn = self.setup(&event).await?;
                info!("Attached {} to {}", arn, event.function);
            }
            Action::Build(components) => {
                let summary = self.build(&event, &components).await?;
                info!(
                    layers = summary.layers.len(),
                    version = summary.version.as_deref().unwrap_or("-"),
                    "Finished {} for {}",
                    components.action(),
                    event.function
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::testing::{FakeFunctions, FakeGit, FakeStore};
    use std::path::Path;
    use std::time::Duration;

    pub fn config(scratch: &Path) -> HandlerConfig {
        HandlerConfig {
            deploy_bucket: "deploys".to_string(),
            git_username: Some("octocat".to_string()),
            git_token: Some("tkn".to_string()),
            git_email: None,
            region: Some("us-east-1".to_string()),
            bootstrapper: "lambda-lambda-lambda".to_string(),
            runtime: Some("python3.12".to_string()),
            scratch_dir: scratch.to_path_buf(),
            pip_command: "true".to_string(),
        }
    }

    pub fn deployer(
        config: HandlerConfig,
        functions: &Arc<FakeFunctions>,
        store: &Arc<FakeStore>,
        git: &Arc<FakeGit>,
    ) -> Deployer {
        Deployer::new(
            config,
            Arc::clone(functions) as Arc<dyn FunctionApi>,
            Arc::clone(store) as Arc<dyn ObjectStore>,
            Arc::clone(git) as Arc<dyn GitClient>,
        )
        .with_update_wait(WaitPolicy {
            interval: Duration::from_millis(1),
            attempts: 10,
        })
    }
}
