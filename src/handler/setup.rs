//! `setup` action

use super::layers::{attach_layers, publish_build_dir, LayerKind};
use super::{Deployer, BUILD_ENV_LAYER, BUILD_ENV_LICENSE};
use crate::error::DeployResult;
use crate::event::InvocationEvent;
use crate::package::BuildDir;
use crate::shell;
use tracing::info;

impl Deployer {
    /// Build the `build-env` layer and attach it to the event's function
    ///
    /// Returns the ARN of the published layer version.
    pub(super) async fn setup(&self, event: &InvocationEvent) -> DeployResult<String> {
        let build = BuildDir::new(self.config.build_dir());
        build.clean()?;

        // No git binary in the Lambda runtime; target builds use Dulwich
        info!("Installing Dulwich and PyYAML");
        let command = format!(
            "{} install --no-cache-dir dulwich PyYAML -t {}",
            self.config.pip_command,
            shell::quote(&build.python_dir().to_string_lossy())
        );
        shell::run_expecting(&command, None, "Successfully installed").await?;

        let runtimes: Vec<String> = self.config.runtime.iter().cloned().collect();
        let arn = publish_build_dir(
            self.functions.as_ref(),
            &build,
            &self.config.scratch_dir,
            BUILD_ENV_LAYER,
            LayerKind::BuildEnv {
                bootstrapper: &self.config.bootstrapper,
            },
            &runtimes,
            Some(BUILD_ENV_LICENSE),
        )
        .await?;

        attach_layers(
            self.functions.as_ref(),
            &event.function,
            &[arn.clone()],
            self.update_wait,
        )
        .await?;
        Ok(arn)
    }
}
