//! Invocation payload and response of the bootstrapper function

use crate::error::{DeployError, DeployResult};
use crate::manifest::DEFAULT_BUILD_FILE;
use serde::{Deserialize, Deserializer, Serialize};

/// Payload the bootstrapper is invoked with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationEvent {
    /// Function being deployed
    pub function: String,

    /// `setup`, or `build` followed by optional components
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_file: Option<String>,

    /// Publish a new version after updating code
    #[serde(
        default,
        deserialize_with = "flexible_bool",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub version: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl InvocationEvent {
    /// Parse an event from raw JSON
    pub fn from_value(value: serde_json::Value) -> DeployResult<Self> {
        serde_json::from_value(value).map_err(|e| DeployError::EventInvalid(e.to_string()))
    }

    /// Repository to build
    pub fn repo_name(&self) -> DeployResult<&str> {
        non_empty(&self.repo_name).ok_or(DeployError::MissingField("repo_name"))
    }

    pub fn branch(&self) -> Option<&str> {
        non_empty(&self.branch)
    }

    pub fn alias(&self) -> Option<&str> {
        non_empty(&self.alias)
    }

    /// Manifest path inside the repository
    pub fn build_file(&self) -> &str {
        non_empty(&self.build_file).unwrap_or(DEFAULT_BUILD_FILE)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Accepts `true`, `"true"`, `"True"` and friends
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<BoolLike>::deserialize(deserializer)? {
        Some(BoolLike::Bool(b)) => b,
        Some(BoolLike::Text(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    })
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Build the git-client layer for the bootstrapper
    Setup,
    /// Build and deploy the selected components
    Build(Components),
}

impl Action {
    /// Parse an action string such as `build dependencies function`
    pub fn parse(action: &str) -> DeployResult<Self> {
        let mut words = action.split_whitespace();
        match words.next() {
            Some("setup") => Ok(Self::Setup),
            Some("build") => Ok(Self::Build(Components::from_words(words))),
            _ => Err(DeployError::UnknownAction(action.to_string())),
        }
    }
}

/// Components selected by a build action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Components {
    All,
    Only(Vec<String>),
}

impl Components {
    fn from_words<'a>(words: impl Iterator<Item = &'a str>) -> Self {
        let names: Vec<String> = words.map(str::to_string).collect();
        if names.is_empty() || names.iter().any(|n| n == "all") {
            Self::All
        } else {
            Self::Only(names)
        }
    }

    /// Whether the named component is selected
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }

    /// Action string for these components
    pub fn action(&self) -> String {
        match self {
            Self::All => "build".to_string(),
            Self::Only(names) => format!("build {}", names.join(" ")),
        }
    }
}

/// Response returned to the invoker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl Response {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: "Success".to_string(),
        }
    }

    pub fn from_error(err: &DeployError) -> Self {
        Self {
            status_code: err.status_code(),
            body: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
