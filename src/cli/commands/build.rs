//! Build command - ask the bootstrapper to build a repository

use crate::aws::{AwsClients, FunctionAdmin};
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::DeployResult;
use crate::event::InvocationEvent;
use crate::provision::remote_response;
use crate::ui::{self, TaskSpinner, UiContext};
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> DeployResult<()> {
    let ctx = UiContext::detect();
    let bootstrapper = args
        .bootstrapper
        .clone()
        .unwrap_or_else(|| config.deploy.function.clone());
    let event = build_event(&args);

    ui::intro(&ctx, &format!("lambda-lambda {}", event.action));
    ui::key_value(&ctx, "Function", &event.function);
    ui::key_value(&ctx, "Repository", args.repo.as_str());
    if let Some(branch) = &event.branch {
        ui::key_value(&ctx, "Branch", branch);
    }

    let region = args.region.as_deref().or(config.deploy.region.as_deref());
    let clients = AwsClients::load(region).await;
    let functions = clients.functions();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Waiting for {}...", bootstrapper));
    match invoke(&functions, &bootstrapper, &event).await {
        Ok((log_tail, result)) => {
            match &result {
                Ok(status) => spinner.stop(&format!("{} returned {}", bootstrapper, status)),
                Err(_) => spinner.stop_error(&format!("{} failed", bootstrapper)),
            }
            if let Some(log) = log_tail {
                ui::log_block(&ctx, "Log tail", &log);
            }
            let status = result?;
            debug!("Build finished with {}", status);
            ui::outro_success(&ctx, &format!("Deployed {}", event.function));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Invocation failed");
            Err(e)
        }
    }
}

/// Event sent to the bootstrapper for these flags
fn build_event(args: &BuildArgs) -> InvocationEvent {
    let action = if args.components.is_empty() {
        "build".to_string()
    } else {
        format!("build {}", args.components.join(" "))
    };

    InvocationEvent {
        function: args.function.clone(),
        action,
        repo_name: Some(args.repo.clone()),
        branch: args.branch.clone(),
        build_file: args.build_file.clone(),
        version: args.version,
        alias: args.alias.clone(),
    }
}

/// Invoke and split the log tail from the interpreted response
///
/// The outer error is a failed API call; the inner one is a failed build.
async fn invoke(
    functions: &dyn FunctionAdmin,
    bootstrapper: &str,
    event: &InvocationEvent,
) -> DeployResult<(Option<String>, DeployResult<String>)> {
    let payload = serde_json::to_value(event)?;
    let outcome = functions.invoke(bootstrapper, &payload).await?;
    let result = remote_response(&outcome).map(|r| format!("{} {}", r.status_code, r.body));
    Ok((outcome.log_tail, result))
}
