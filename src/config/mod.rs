//! Configuration management
//!
//! The operator CLI keeps its settings in a TOML file; the bootstrapper
//! function reads its settings from the Lambda environment (see [`handler`]).

pub mod handler;
pub mod schema;

pub use handler::HandlerConfig;
pub use schema::Config;

use crate::error::{DeployError, DeployResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use toml_edit::{value, DocumentMut};
use tracing::{debug, info};

/// Keys accepted by `config set`, with their value kinds
const SETTABLE_KEYS: &[(&str, KeyKind)] = &[
    ("general.log_format", KeyKind::Text),
    ("github.git_email", KeyKind::Text),
    ("github.git_token", KeyKind::Text),
    ("github.git_username", KeyKind::Text),
    ("deploy.bucket", KeyKind::Text),
    ("deploy.function", KeyKind::Text),
    ("deploy.region", KeyKind::Text),
    ("deploy.timeout_secs", KeyKind::Integer),
    ("deploy.memory_mb", KeyKind::Integer),
];

#[derive(Debug, Clone, Copy)]
enum KeyKind {
    Text,
    Integer,
}

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lambda-lambda")
            .join("config.toml")
    }

    /// Keys accepted by [`ConfigManager::set_value`]
    pub fn settable_keys() -> impl Iterator<Item = &'static str> {
        SETTABLE_KEYS.iter().map(|(key, _)| *key)
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> DeployResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> DeployResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| DeployError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| DeployError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> DeployResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        self.write(&content).await?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set a single dotted key, preserving comments and layout of the file
    pub async fn set_value(&self, key: &str, raw: &str) -> DeployResult<()> {
        let kind = SETTABLE_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| DeployError::ConfigKey(key.to_string()))?;

        let existing = if self.config_path.exists() {
            fs::read_to_string(&self.config_path).await.map_err(|e| {
                DeployError::io(format!("reading config from {}", self.config_path.display()), e)
            })?
        } else {
            String::new()
        };

        let updated = apply_setting(&existing, key, raw, kind)?;

        // Reject edits that would leave the file unloadable
        toml::from_str::<Config>(&updated).map_err(|e| DeployError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;

        self.ensure_config_dir().await?;
        self.write(&updated).await?;
        debug!("Set {} in {}", key, self.config_path.display());
        Ok(())
    }

    async fn write(&self, content: &str) -> DeployResult<()> {
        fs::write(&self.config_path, content).await.map_err(|e| {
            DeployError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        // The file holds a source control token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, perms)
                .map_err(|e| DeployError::io("setting config file permissions", e))?;
        }

        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> DeployResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DeployError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_setting(existing: &str, key: &str, raw: &str, kind: KeyKind) -> DeployResult<String> {
    let mut doc: DocumentMut = existing.parse()?;
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| DeployError::ConfigKey(key.to_string()))?;

    let item = match kind {
        KeyKind::Text => value(raw),
        KeyKind::Integer => {
            let parsed: i64 = raw
                .parse()
                .map_err(|_| DeployError::User(format!("{} expects an integer, got {}", key, raw)))?;
            value(parsed)
        }
    };

    if !doc.contains_table(section) {
        doc[section] = toml_edit::table();
    }
    doc[section][field] = item;

    Ok(doc.to_string())
}

/// Render configuration for display with the token masked
pub fn render_masked(config: &Config) -> DeployResult<String> {
    let mut shown = config.clone();
    if shown.github.git_token.as_deref().is_some_and(|t| !t.is_empty()) {
        shown.github.git_token = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
