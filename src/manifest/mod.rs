//! Build manifest parsing
//!
//! Each deployable repository carries a `build.yaml` (or `build.json`)
//! describing the function package and the layers it needs.

pub mod editable;

pub use editable::{EditableRequirement, RequirementsScan};

use crate::error::{DeployError, DeployResult};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;

/// Default manifest file name
pub const DEFAULT_BUILD_FILE: &str = "build.yaml";

/// Layer names that are never built as user layers
pub const RESERVED_LAYER_NAMES: &[&str] = &["function", "dependencies", "all"];

/// Parsed build manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildManifest {
    /// Function package definition, needed only for the `function` and
    /// `dependencies` components
    #[serde(default)]
    pub function: Option<FunctionSpec>,

    /// Dependency files and user-defined layers
    #[serde(default)]
    pub layers: Layers,
}

/// Function package section
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionSpec {
    /// Directory inside the repository that `files` are relative to
    #[serde(default)]
    pub source_dir: String,

    /// Files and directories copied into the package
    pub files: Vec<String>,

    /// Compatible runtimes, also applied to the dependencies layer
    #[serde(default)]
    pub runtimes: Vec<String>,

    #[serde(default, deserialize_with = "license")]
    pub license: Option<String>,
}

/// A user-defined layer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LayerSpec {
    #[serde(default)]
    pub source_dir: String,

    /// Directory inside the layer archive that files land in
    #[serde(default)]
    pub dest_dir: String,

    #[serde(default)]
    pub files: Vec<String>,

    /// Shell commands run in the repository before copying files
    #[serde(default)]
    pub preinstall: Vec<String>,

    #[serde(default)]
    pub runtimes: Vec<String>,

    #[serde(default, deserialize_with = "license")]
    pub license: Option<String>,
}

/// The `layers` mapping
///
/// `dependencies` holds a list of requirements files; every other key is a
/// layer definition. Layers keep the order they are written in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layers {
    pub dependencies: Vec<String>,
    pub user: Vec<(String, LayerSpec)>,
}

impl Layers {
    /// User layers, skipping reserved names
    pub fn buildable(&self) -> impl Iterator<Item = (&str, &LayerSpec)> {
        self.user
            .iter()
            .filter(|(name, _)| !RESERVED_LAYER_NAMES.contains(&name.as_str()))
            .map(|(name, spec)| (name.as_str(), spec))
    }
}

impl<'de> Deserialize<'de> for Layers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LayersVisitor)
    }
}

struct LayersVisitor;

impl<'de> Visitor<'de> for LayersVisitor {
    type Value = Layers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of layer names to layer definitions")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Layers, E> {
        Ok(Layers::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Layers, E> {
        Ok(Layers::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Layers, A::Error> {
        let mut layers = Layers::default();
        while let Some(name) = map.next_key::<String>()? {
            if name == "dependencies" {
                layers.dependencies = map.next_value::<Option<Vec<String>>>()?.unwrap_or_default();
            } else {
                let spec = map.next_value::<Option<LayerSpec>>()?.unwrap_or_default();
                layers.user.push((name, spec));
            }
        }
        Ok(layers)
    }
}

/// Accepts `license: MIT` or `license: [MIT, Apache-2.0]`
fn license<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if !s.is_empty() => Some(s),
        Some(OneOrMany::Many(v)) if !v.is_empty() => Some(v.join("/")),
        _ => None,
    })
}

/// Supported manifest encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Detect the format from a file name
    pub fn detect(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

impl BuildManifest {
    /// The `function` section, or an error naming the component that needs it
    ///
    /// `path` is the manifest location reported in the error.
    pub fn function_spec(&self, path: &Path, component: &str) -> DeployResult<&FunctionSpec> {
        self.function
            .as_ref()
            .ok_or_else(|| DeployError::ManifestInvalid {
                path: path.to_path_buf(),
                reason: format!("missing function section, required to build {}", component),
            })
    }

    /// Load `build_file` from a checked-out repository
    pub async fn load(repo_dir: &Path, build_file: &str) -> DeployResult<Self> {
        let path = repo_dir.join(build_file);
        let format =
            ManifestFormat::detect(&path).ok_or_else(|| DeployError::ManifestFormat(path.clone()))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| DeployError::io(format!("reading build file {}", path.display()), e))?;

        Self::parse(&content, format).map_err(|reason| DeployError::ManifestInvalid {
            path: path.clone(),
            reason,
        })
    }

    /// Parse manifest text in the given format
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, String> {
        match format {
            ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}
