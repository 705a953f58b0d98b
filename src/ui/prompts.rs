//! Confirmation prompts

use super::context::UiContext;
use crate::error::{DeployError, DeployResult};

/// Ask a yes/no question; `--yes` approves and non-interactive runs take `default`
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> DeployResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| DeployError::User(format!("Prompt task failed: {}", e)))?
    .map_err(|e| DeployError::User(format!("Prompt failed: {}", e)))
}
