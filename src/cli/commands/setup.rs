//! Setup command - provision the bootstrapper function

use crate::aws::AwsClients;
use crate::cli::args::SetupArgs;
use crate::config::Config;
use crate::error::{DeployError, DeployResult};
use crate::provision::{BootstrapperSpec, FunctionOutcome, Provisioner, WaitPolicy, BOOTSTRAP_ENTRY};
use crate::ui::{self, TaskSpinner, UiContext, WaitProgress};
use std::path::PathBuf;
use tracing::debug;

/// Execute the setup command
pub async fn execute(args: SetupArgs, config: &Config) -> DeployResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let github = config.github.clone().with_overrides(|key| std::env::var(key).ok());
    let spec = resolve_bootstrapper(&args, config, github.function_env())?;
    let binary = match &args.binary {
        Some(path) => path.clone(),
        None => default_binary()?,
    };

    ui::intro(&ctx, "lambda-lambda setup");

    let region = args.region.as_deref().or(config.deploy.region.as_deref());
    let clients = AwsClients::load(region).await;
    ui::key_value(&ctx, "Function", &spec.function);
    ui::key_value(&ctx, "Bucket", &spec.bucket);
    ui::key_value(&ctx, "Region", clients.region().unwrap_or("(default)"));
    ui::key_value(&ctx, "Binary", &binary.display().to_string());
    if github.git_username.is_none() {
        ui::step_warn(
            &ctx,
            "No git username configured; builds will fail until github.git_username is set",
        );
    }

    if !ui::confirm(&ctx, &format!("Provision {}?", spec.function), true).await? {
        ui::outro_error(&ctx, "Setup cancelled");
        return Ok(());
    }

    let functions = clients.functions();
    let store = clients.store();
    let roles = clients.roles();
    let provisioner = Provisioner::new(&functions, &store, &roles);

    ui::section(&ctx, "Provisioning");

    let work_dir = std::env::temp_dir().join("lambda-lambda");
    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(|e| DeployError::io(format!("creating {}", work_dir.display()), e))?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Uploading package...");
    let (location, archive) = match provisioner.upload_package(&spec, &binary, &work_dir).await {
        Ok(uploaded) => uploaded,
        Err(e) => {
            spinner.stop_error("Upload failed");
            return Err(e);
        }
    };
    debug!("Package sha256 {}", archive.sha256);
    spinner.stop(&format!("Uploaded {} ({} bytes)", location, archive.size));

    spinner.start("Checking execution role...");
    let role = match provisioner.ensure_role(&spec.function).await {
        Ok(role) => role,
        Err(e) => {
            spinner.stop_error("Role setup failed");
            return Err(e);
        }
    };
    if role.created {
        spinner.stop(&format!("Created role {}", role.arn));
    } else {
        spinner.stop(&format!("Using role {}", role.arn));
    }

    spinner.start("Deploying function...");
    match provisioner.deploy_function(&spec, &role.arn, &location).await {
        Ok(FunctionOutcome::Created { arn }) => spinner.stop(&format!("Created {}", arn)),
        Ok(FunctionOutcome::Updated { code_sha256 }) => {
            spinner.stop(&format!("Updated {} code", spec.function));
            if code_sha256 != archive.code_sha256 {
                ui::step_warn(
                    &ctx,
                    &format!(
                        "Deployed CodeSha256 {} does not match package {}",
                        code_sha256, archive.code_sha256
                    ),
                );
            }
        }
        Err(e) => {
            spinner.stop_error("Deploy failed");
            return Err(e);
        }
    }

    let policy = WaitPolicy::default();
    let progress = WaitProgress::new(&ctx, &spec.function, policy.attempts);
    let waited = provisioner
        .wait_until_ready(&spec.function, policy, |state| progress.on_poll(&state.detail))
        .await;
    progress.finish();
    waited?;
    ui::step_ok(&ctx, &format!("{} is ready", spec.function));

    if args.skip_invoke {
        ui::step_info(&ctx, "Skipped setup invocation");
        ui::outro_success(&ctx, "Bootstrapper provisioned");
        return Ok(());
    }

    spinner.start("Building git layer...");
    let (outcome, response) = match provisioner.invoke_setup(&spec.function).await {
        Ok(invoked) => invoked,
        Err(e) => {
            spinner.stop_error("Setup invocation failed");
            return Err(e);
        }
    };
    spinner.stop(&format!("Setup returned {}", response.status_code));
    if let Some(log) = &outcome.log_tail {
        ui::log_block(&ctx, "Log tail", log);
    }
    ui::key_value(&ctx, "Response", &response.body);

    ui::outro_success(&ctx, "Bootstrapper ready");
    Ok(())
}

/// Combine flags with configured defaults
fn resolve_bootstrapper(
    args: &SetupArgs,
    config: &Config,
    environment: Vec<(&'static str, String)>,
) -> DeployResult<BootstrapperSpec> {
    let bucket = args
        .bucket
        .clone()
        .or_else(|| config.deploy.bucket.clone())
        .filter(|b| !b.is_empty())
        .ok_or(DeployError::MissingBucket)?;

    Ok(BootstrapperSpec {
        function: args
            .function
            .clone()
            .unwrap_or_else(|| config.deploy.function.clone()),
        bucket,
        timeout_secs: args.timeout.unwrap_or(config.deploy.timeout_secs),
        memory_mb: args.memory.unwrap_or(config.deploy.memory_mb),
        environment,
    })
}

/// The `bootstrap` executable installed next to this binary
fn default_binary() -> DeployResult<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| DeployError::io("locating executable", e))?;
    let dir = exe
        .parent()
        .ok_or_else(|| DeployError::Internal(format!("{} has no parent", exe.display())))?;
    Ok(dir.join(BOOTSTRAP_ENTRY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;

    fn setup_args(argv: &[&str]) -> SetupArgs {
        let mut full = vec!["lambda-lambda", "setup"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Setup(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn defaults_from_config() {
        let mut config = Config::default();
        config.deploy.bucket = Some("deploys".to_string());

        let spec = resolve_bootstrapper(&setup_args(&[]), &config, Vec::new()).unwrap();
        assert_eq!(spec.function, "lambda-lambda-lambda");
        assert_eq!(spec.bucket, "deploys");
        assert_eq!(spec.timeout_secs, 60);
        assert_eq!(spec.memory_mb, 2048);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.deploy.bucket = Some("deploys".to_string());

        let args = setup_args(&["-b", "other", "-f", "builder", "--memory", "512"]);
        let env = vec![("git_username", "octocat".to_string())];
        let spec = resolve_bootstrapper(&args, &config, env).unwrap();
        assert_eq!(spec.bucket, "other");
        assert_eq!(spec.function, "builder");
        assert_eq!(spec.memory_mb, 512);
        assert_eq!(spec.environment, vec![("git_username", "octocat".to_string())]);
    }

    #[test]
    fn bucket_is_required() {
        let err = resolve_bootstrapper(&setup_args(&[]), &Config::default(), Vec::new()).unwrap_err();
        assert!(matches!(err, DeployError::MissingBucket));
    }

    #[test]
    fn default_binary_sits_next_to_executable() {
        let path = default_binary().unwrap();
        assert_eq!(path.file_name().unwrap(), "bootstrap");
    }
}
