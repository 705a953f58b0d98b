//! Layer publishing and attachment

use crate::aws::{FunctionApi, LayerPublication, WaitPolicy};
use crate::error::{DeployError, DeployResult};
use crate::package::BuildDir;
use std::path::Path;
use tracing::info;

/// What a published layer carries, used for its description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind<'a> {
    /// Requirements of the target function
    Dependencies,
    /// Git client and YAML parser for the bootstrapper itself
    BuildEnv { bootstrapper: &'a str },
    /// A layer declared in the build manifest
    User,
}

impl LayerKind<'_> {
    pub fn description(&self) -> String {
        match self {
            Self::Dependencies => "dependencies from requirements.txt".to_string(),
            Self::BuildEnv { bootstrapper } => {
                format!("dependencies for {} (Dulwich and PyYAML)", bootstrapper)
            }
            Self::User => "additional deployment files".to_string(),
        }
    }
}

/// Name segment of a layer version ARN
///
/// `arn:aws:lambda:<region>:<account>:layer:<name>:<version>` yields `<name>`.
pub fn layer_name_of(arn: &str) -> Option<&str> {
    arn.rsplit(':').nth(1)
}

/// New layers first, then existing layers not replaced by a new one
pub fn merge_layers(new: &[String], existing: &[String]) -> Vec<String> {
    let new_names: Vec<&str> = new.iter().filter_map(|arn| layer_name_of(arn)).collect();

    new.iter()
        .cloned()
        .chain(
            existing
                .iter()
                .filter(|arn| !layer_name_of(arn).is_some_and(|name| new_names.contains(&name)))
                .cloned(),
        )
        .collect()
}

/// Attach `new` layer versions to `function`, keeping its unrelated layers
///
/// Returns once the configuration update has settled.
pub async fn attach_layers(
    functions: &dyn FunctionApi,
    function: &str,
    new: &[String],
    wait: WaitPolicy,
) -> DeployResult<Vec<String>> {
    let existing = functions.layer_arns(function).await?;
    let merged = merge_layers(new, &existing);
    info!(
        "Updating {} with layers:\n  {}",
        function,
        merged.join("\n  ")
    );
    functions.set_layers(function, &merged).await?;
    functions.wait_until_updated(function, wait).await?;
    Ok(merged)
}

/// Zip the build dir and publish it as layer `name`
pub async fn publish_build_dir(
    functions: &dyn FunctionApi,
    build: &BuildDir,
    scratch: &Path,
    name: &str,
    kind: LayerKind<'_>,
    runtimes: &[String],
    license: Option<&str>,
) -> DeployResult<String> {
    let archive = build.archive(&scratch.join(format!("{}.zip", name))).await?;
    let zip = tokio::fs::read(&archive.path)
        .await
        .map_err(|e| DeployError::io(format!("reading {}", archive.path.display()), e))?;

    info!("Publishing {} layer", name);
    functions
        .publish_layer(&LayerPublication {
            name: name.to_string(),
            description: kind.description(),
            zip,
            runtimes: runtimes.to_vec(),
            license: license.map(str::to_string),
        })
        .await
}
