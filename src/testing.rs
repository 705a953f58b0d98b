//! In-memory fakes for the cloud and git seams

use crate::aws::{
    FunctionAdmin, FunctionApi, FunctionDefinition, FunctionState, InvokeOutcome,
    LayerPublication, ObjectStore, RoleApi, RoleDefinition, S3Location,
};
use crate::error::{DeployError, DeployResult};
use crate::git::GitClient;
use crate::package::copy_path;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CODE_SHA: &str = "c2hhMjU2LW9mLXRoZS1wYWNrYWdl";

pub fn layer_arn(name: &str, version: usize) -> String {
    format!("arn:aws:lambda:us-east-1:123456789012:layer:{}:{}", name, version)
}

#[derive(Default)]
pub struct FakeFunctionsState {
    pub published: Vec<LayerPublication>,
    pub layers: HashMap<String, Vec<String>>,
    pub code_updates: Vec<(String, S3Location)>,
    pub versions: Vec<(String, String)>,
    pub aliases: BTreeMap<(String, String), String>,
    pub alias_calls: Vec<String>,
    pub existing: Vec<String>,
    pub created: Vec<FunctionDefinition>,
    pub config_updates: Vec<FunctionDefinition>,
    pub states: VecDeque<FunctionState>,
    /// Polls each configuration or code update stays in progress for
    pub update_polls: u32,
    /// Remaining in-progress polls per function
    pub updating: HashMap<String, u32>,
    /// Mutations rejected because an update was still in progress
    pub conflicts: Vec<String>,
    pub invocations: Vec<(String, serde_json::Value)>,
    pub invoke_outcome: Option<InvokeOutcome>,
}

/// Records every Lambda call and answers from memory
#[derive(Default)]
pub struct FakeFunctions {
    pub state: Mutex<FakeFunctionsState>,
}

impl FakeFunctionsState {
    /// Fail like Lambda does when `function` is mid-update
    fn ensure_idle(&mut self, function: &str, operation: &str) -> DeployResult<()> {
        if self.updating.get(function).is_some_and(|polls| *polls > 0) {
            self.conflicts.push(format!("{} {}", operation, function));
            return Err(DeployError::aws(
                operation,
                format!(
                    "ResourceConflictException: An update is in progress for resource: {}",
                    function
                ),
            ));
        }
        Ok(())
    }

    fn begin_update(&mut self, function: &str, operation: &str) -> DeployResult<()> {
        self.ensure_idle(function, operation)?;
        if self.update_polls > 0 {
            self.updating.insert(function.to_string(), self.update_polls);
        }
        Ok(())
    }
}

impl FakeFunctions {
    /// Every update stays in progress for `polls` state checks
    pub fn with_update_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().update_polls = polls;
        self
    }

    pub fn with_layers(function: &str, layers: &[String]) -> Self {
        let fake = Self::default();
        fake.state
            .lock()
            .unwrap()
            .layers
            .insert(function.to_string(), layers.to_vec());
        fake
    }

    pub fn layers_of(&self, function: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .layers
            .get(function)
            .cloned()
            .unwrap_or_default()
    }

    pub fn published_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .published
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }
}

#[async_trait]
impl FunctionApi for FakeFunctions {
    async fn publish_layer(&self, layer: &LayerPublication) -> DeployResult<String> {
        let mut state = self.state.lock().unwrap();
        let version = state.published.iter().filter(|p| p.name == layer.name).count() + 1;
        state.published.push(layer.clone());
        Ok(layer_arn(&layer.name, version))
    }

    async fn layer_arns(&self, function: &str) -> DeployResult<Vec<String>> {
        Ok(self.layers_of(function))
    }

    async fn function_state(&self, function: &str) -> DeployResult<FunctionState> {
        let mut state = self.state.lock().unwrap();
        if let Some(polls) = state.updating.get_mut(function).filter(|p| **p > 0) {
            *polls -= 1;
            return Ok(FunctionState {
                ready: false,
                failed: false,
                detail: "Active/InProgress".to_string(),
            });
        }
        Ok(state.states.pop_front().unwrap_or(FunctionState {
            ready: true,
            failed: false,
            detail: "Active/Successful".to_string(),
        }))
    }

    async fn set_layers(&self, function: &str, layers: &[String]) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.begin_update(function, "update function configuration")?;
        state.layers.insert(function.to_string(), layers.to_vec());
        Ok(())
    }

    async fn update_code(&self, function: &str, code: &S3Location) -> DeployResult<String> {
        let mut state = self.state.lock().unwrap();
        state.begin_update(function, "update function code")?;
        state
            .code_updates
            .push((function.to_string(), code.clone()));
        Ok(CODE_SHA.to_string())
    }

    async fn publish_version(&self, function: &str, code_sha256: &str) -> DeployResult<String> {
        let mut state = self.state.lock().unwrap();
        state.ensure_idle(function, "publish version")?;
        state
            .versions
            .push((function.to_string(), code_sha256.to_string()));
        Ok(state.versions.len().to_string())
    }

    async fn alias_version(&self, function: &str, alias: &str) -> DeployResult<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .aliases
            .get(&(function.to_string(), alias.to_string()))
            .cloned())
    }

    async fn create_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.alias_calls.push(format!("create {}={}", alias, version));
        state
            .aliases
            .insert((function.to_string(), alias.to_string()), version.to_string());
        Ok(())
    }

    async fn update_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.alias_calls.push(format!("update {}={}", alias, version));
        state
            .aliases
            .insert((function.to_string(), alias.to_string()), version.to_string());
        Ok(())
    }
}

#[async_trait]
impl FunctionAdmin for FakeFunctions {
    async fn function_exists(&self, function: &str) -> DeployResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .existing
            .iter()
            .any(|f| f == function))
    }

    async fn create_function(&self, definition: &FunctionDefinition) -> DeployResult<String> {
        let mut state = self.state.lock().unwrap();
        state.created.push(definition.clone());
        state.existing.push(definition.name.clone());
        Ok(format!(
            "arn:aws:lambda:us-east-1:123456789012:function:{}",
            definition.name
        ))
    }

    async fn update_configuration(&self, definition: &FunctionDefinition) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.begin_update(&definition.name, "update function configuration")?;
        state.config_updates.push(definition.clone());
        Ok(())
    }

    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> DeployResult<InvokeOutcome> {
        let mut state = self.state.lock().unwrap();
        state
            .invocations
            .push((function.to_string(), payload.clone()));
        Ok(state.invoke_outcome.clone().unwrap_or(InvokeOutcome {
            status_code: 200,
            function_error: None,
            log_tail: Some("START\nEND\n".to_string()),
            payload: Some(serde_json::json!({"statusCode": 200, "body": "Success"})),
        }))
    }
}

/// Keeps uploaded bytes keyed by location
#[derive(Default)]
pub struct FakeStore {
    pub uploads: Mutex<Vec<(S3Location, Vec<u8>)>>,
}

impl FakeStore {
    pub fn keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(loc, _)| loc.to_string())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_file(&self, location: &S3Location, path: &Path) -> DeployResult<()> {
        let bytes = std::fs::read(path).map_err(|e| DeployError::io("reading upload", e))?;
        self.uploads
            .lock()
            .unwrap()
            .push((location.clone(), bytes));
        Ok(())
    }
}

/// Serves clones from local directories registered per URL
#[derive(Default)]
pub struct FakeGit {
    pub sources: HashMap<String, PathBuf>,
    pub calls: Mutex<Vec<(String, PathBuf, Option<String>)>>,
}

impl FakeGit {
    pub fn serve(mut self, url: &str, source: &Path) -> Self {
        self.sources.insert(url.to_string(), source.to_path_buf());
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl GitClient for FakeGit {
    async fn clone_or_pull(
        &self,
        url: &str,
        dest: &Path,
        reference: Option<&str>,
    ) -> DeployResult<()> {
        self.calls.lock().unwrap().push((
            url.to_string(),
            dest.to_path_buf(),
            reference.map(str::to_string),
        ));
        let source = self.sources.get(url).ok_or_else(|| DeployError::GitClone {
            url: url.to_string(),
            reason: "repository not found".to_string(),
        })?;
        copy_path(source, dest)
    }
}

#[derive(Default)]
pub struct FakeRolesState {
    pub roles: HashMap<String, String>,
    pub created: Vec<RoleDefinition>,
    pub attached: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeRoles {
    pub state: Mutex<FakeRolesState>,
}

#[async_trait]
impl RoleApi for FakeRoles {
    async fn role_arn(&self, name: &str) -> DeployResult<Option<String>> {
        Ok(self.state.lock().unwrap().roles.get(name).cloned())
    }

    async fn create_role(&self, role: &RoleDefinition) -> DeployResult<String> {
        let mut state = self.state.lock().unwrap();
        let arn = format!(
            "arn:aws:iam::123456789012:role{}{}",
            role.path, role.name
        );
        state.roles.insert(role.name.clone(), arn.clone());
        state.created.push(role.clone());
        Ok(arn)
    }

    async fn attach_policy(&self, role: &str, policy_arn: &str) -> DeployResult<()> {
        self.state
            .lock()
            .unwrap()
            .attached
            .push((role.to_string(), policy_arn.to_string()));
        Ok(())
    }
}
