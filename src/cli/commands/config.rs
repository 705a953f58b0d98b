//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{render_masked, Config, ConfigManager};
use crate::error::{DeployError, DeployResult};
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> DeployResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> DeployResult<()> {
    println!("{}", render_masked(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> DeployResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn(
            &ctx,
            &format!(
                "Config already exists at {} (use --force to overwrite)",
                path.display()
            ),
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> DeployResult<()> {
    let ctx = UiContext::detect();

    match manager.set_value(key, value).await {
        Ok(()) => {
            let shown = if key == "github.git_token" { "********" } else { value };
            ui::step_ok(&ctx, &format!("Set {} = {}", key, shown));
            Ok(())
        }
        Err(DeployError::ConfigKey(key)) => {
            eprintln!("Valid keys:");
            for valid in ConfigManager::settable_keys() {
                eprintln!("  {}", valid);
            }
            Err(DeployError::ConfigKey(key))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_writes_defaults_once() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        init_config(&manager, false).await.unwrap();
        manager.set_value("deploy.bucket", "deploys").await.unwrap();

        // A second init without --force keeps the edited file
        init_config(&manager, false).await.unwrap();
        let config = manager.load().await.unwrap();
        assert_eq!(config.deploy.bucket.as_deref(), Some("deploys"));

        init_config(&manager, true).await.unwrap();
        let config = manager.load().await.unwrap();
        assert!(config.deploy.bucket.is_none());
    }

    #[tokio::test]
    async fn set_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        let err = set_value(&manager, "vm.name", "x").await.unwrap_err();
        assert!(matches!(err, DeployError::ConfigKey(_)));
        assert!(!manager.path().exists());
    }
}
