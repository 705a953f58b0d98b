//! `build` action

use super::layers::{attach_layers, publish_build_dir, LayerKind};
use super::{Deployer, FUNCTION_ARCHIVE};
use crate::aws::S3Location;
use crate::error::{DeployError, DeployResult};
use crate::event::{Components, InvocationEvent};
use crate::git;
use crate::manifest::{BuildManifest, FunctionSpec, LayerSpec, RequirementsScan};
use crate::package::BuildDir;
use crate::shell;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Artifacts produced by one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Layer versions published, in publish order
    pub layers: Vec<String>,
    /// `CodeSha256` reported after the code update
    pub code_sha256: Option<String>,
    pub version: Option<String>,
    pub alias: Option<String>,
}

impl Deployer {
    pub(super) async fn build(
        &self,
        event: &InvocationEvent,
        components: &Components,
    ) -> DeployResult<BuildSummary> {
        let repo_name = event.repo_name()?;
        let username = self.config.require_username()?;
        let repo_dir = self.config.repo_dir(repo_name);
        let url = git::repository_url(username, repo_name, self.config.git_token.as_deref());

        self.git
            .clone_or_pull(&url, &repo_dir, event.branch())
            .await?;
        let manifest = BuildManifest::load(&repo_dir, event.build_file()).await?;
        let manifest_path = repo_dir.join(event.build_file());

        // Fail before publishing anything when a selected component needs `function`
        if components.includes("function") {
            manifest.function_spec(&manifest_path, "function")?;
        } else if components.includes("dependencies") && !manifest.layers.dependencies.is_empty() {
            manifest.function_spec(&manifest_path, "dependencies")?;
        }

        let build = BuildDir::new(self.config.build_dir());
        let mut summary = BuildSummary::default();

        if components.includes("dependencies") {
            if let Some(arn) = self
                .build_dependencies(&event.function, &repo_dir, &manifest_path, &manifest, &build)
                .await?
            {
                summary.layers.push(arn);
            }
        }

        for (name, layer) in manifest.layers.buildable() {
            if components.includes(name) {
                let arn = self.build_user_layer(&repo_dir, name, layer, &build).await?;
                summary.layers.push(arn);
            }
        }

        if !summary.layers.is_empty() {
            attach_layers(
                self.functions.as_ref(),
                &event.function,
                &summary.layers,
                self.update_wait,
            )
            .await?;
        }

        if components.includes("function") {
            let spec = manifest.function_spec(&manifest_path, "function")?;
            self.deploy_function(event, &repo_dir, spec, &build, &mut summary)
                .await?;
        }

        Ok(summary)
    }

    async fn build_dependencies(
        &self,
        function: &str,
        repo_dir: &Path,
        manifest_path: &Path,
        manifest: &BuildManifest,
        build: &BuildDir,
    ) -> DeployResult<Option<String>> {
        if manifest.layers.dependencies.is_empty() {
            info!("No requirements files listed, skipping dependencies layer");
            return Ok(None);
        }
        let spec = manifest.function_spec(manifest_path, "dependencies")?;

        build.clean()?;
        for file in &manifest.layers.dependencies {
            self.install_requirements(repo_dir, file, build).await?;
        }

        let arn = publish_build_dir(
            self.functions.as_ref(),
            build,
            &self.config.scratch_dir,
            &format!("{}-dependencies", function),
            LayerKind::Dependencies,
            &spec.runtimes,
            spec.license.as_deref(),
        )
        .await?;
        Ok(Some(arn))
    }

    async fn install_requirements(
        &self,
        repo_dir: &Path,
        file: &str,
        build: &BuildDir,
    ) -> DeployResult<()> {
        let path = repo_dir.join(file);
        info!("Checking for editable packages in {}", file);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DeployError::io(format!("reading {}", path.display()), e))?;
        let scan = RequirementsScan::scan(&content);
        for target in &scan.unparsed {
            warn!("Skipping editable {}: not a <vcs>+<scheme>://<host>/<owner>/<repo> URL", target);
        }

        if scan.installable.is_empty() {
            info!("Nothing to install from {}", file);
        } else {
            // pip cannot fetch VCS requirements without git, so they are filtered out
            let filtered = installable_path(&path);
            tokio::fs::write(&filtered, scan.installable_file())
                .await
                .map_err(|e| DeployError::io(format!("writing {}", filtered.display()), e))?;

            info!("Installing requirements from {}", file);
            let command = format!(
                "{} install --no-cache-dir -r {} -t {}",
                self.config.pip_command,
                shell::quote(&filtered.to_string_lossy()),
                shell::quote(&build.python_dir().to_string_lossy())
            );
            shell::run_checked(&command, Some(repo_dir)).await?;
        }

        for requirement in &scan.editable {
            let url = match self.config.git_username.as_deref() {
                Some(username) => git::inject_credentials(
                    &requirement.repo_url,
                    username,
                    self.config.git_token.as_deref(),
                ),
                None => requirement.repo_url.clone(),
            };
            let clone_dir = repo_dir
                .join("venv")
                .join("src")
                .join(requirement.module_name());

            self.git
                .clone_or_pull(&url, &clone_dir, requirement.branch.as_deref())
                .await?;
            for module_dir in requirement.module_dirs() {
                build.copy_module(&clone_dir, &module_dir)?;
            }
        }
        Ok(())
    }

    async fn build_user_layer(
        &self,
        repo_dir: &Path,
        name: &str,
        layer: &LayerSpec,
        build: &BuildDir,
    ) -> DeployResult<String> {
        info!("Building {} layer", name);
        build.clean()?;

        for command in &layer.preinstall {
            info!("{}", command);
            shell::run_checked(&preinstall_command(repo_dir, command), Some(repo_dir)).await?;
        }

        build.copy_files(&repo_dir.join(&layer.source_dir), &layer.files, &layer.dest_dir)?;

        publish_build_dir(
            self.functions.as_ref(),
            build,
            &self.config.scratch_dir,
            name,
            LayerKind::User,
            &layer.runtimes,
            layer.license.as_deref(),
        )
        .await
    }

    async fn deploy_function(
        &self,
        event: &InvocationEvent,
        repo_dir: &Path,
        spec: &FunctionSpec,
        build: &BuildDir,
        summary: &mut BuildSummary,
    ) -> DeployResult<()> {
        let function = event.function.as_str();
        info!("Building {} package", function);
        build.clean()?;
        build.copy_files(&repo_dir.join(&spec.source_dir), &spec.files, "")?;

        let archive = build
            .archive(&self.config.scratch_dir.join(FUNCTION_ARCHIVE))
            .await?;
        let location = S3Location::new(
            &self.config.deploy_bucket,
            format!("{}/{}", function, FUNCTION_ARCHIVE),
        );
        self.store.put_file(&location, &archive.path).await?;

        let code_sha256 = self.functions.update_code(function, &location).await?;
        self.functions
            .wait_until_updated(function, self.update_wait)
            .await?;
        if code_sha256 != archive.code_sha256 {
            warn!(
                "CodeSha256 {} does not match local package {}",
                code_sha256, archive.code_sha256
            );
        }

        if event.version {
            let version = self.functions.publish_version(function, &code_sha256).await?;
            info!("Updated {} to version {}", function, version);
            summary.version = Some(version);
        }
        summary.code_sha256 = Some(code_sha256);

        if let Some(alias) = event.alias() {
            let target = summary.version.as_deref().unwrap_or("$LATEST");
            match self.functions.alias_version(function, alias).await? {
                Some(_) => {
                    self.functions.update_alias(function, alias, target).await?;
                    info!("Updated alias {} to invoke version {}", alias, target);
                }
                None => {
                    self.functions.create_alias(function, alias, target).await?;
                    info!("Created alias {} to invoke version {}", alias, target);
                }
            }
            summary.alias = Some(alias.to_string());
        }
        Ok(())
    }
}

/// Sibling of a requirements file holding only its installable lines
///
/// Living next to the original keeps relative `-r` includes resolvable.
fn installable_path(requirements: &Path) -> PathBuf {
    let name = requirements
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "requirements.txt".to_string());
    requirements.with_file_name(format!(".{}.installable", name))
}

/// Wrap python and pip commands so they run inside the repository's venv
fn preinstall_command(repo_dir: &Path, command: &str) -> String {
    let activate = repo_dir.join("venv").join("bin").join("activate");
    let uses_python = command.starts_with("python") || command.starts_with("pip");
    if uses_python && activate.is_file() {
        format!(
            "source {} && {}",
            shell::quote(&activate.to_string_lossy()),
            command
        )
    } else {
        command.to_string()
    }
}
