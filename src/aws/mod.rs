//! Cloud API access
//!
//! The build pipeline and the provisioner talk to Lambda, S3 and IAM only
//! through the traits in this module, so they can run against in-memory
//! fakes in tests.

mod iam;
mod lambda;
mod s3;

pub use iam::IamRoles;
pub use lambda::LambdaFunctions;
pub use s3::S3Store;

use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// A layer version to publish
#[derive(Debug, Clone)]
pub struct LayerPublication {
    pub name: String,
    pub description: String,
    /// Zip archive contents
    pub zip: Vec<u8>,
    pub runtimes: Vec<String>,
    pub license: Option<String>,
}

/// Object in the deploy bucket holding a function package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for S3Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Everything needed to create a function from a package in S3
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub role_arn: String,
    pub runtime: String,
    pub handler: String,
    pub description: String,
    pub timeout_secs: i32,
    pub memory_mb: i32,
    pub code: S3Location,
    pub environment: BTreeMap<String, String>,
}

/// Readiness polling limits
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            attempts: 60,
        }
    }
}

/// Readiness of a function for invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionState {
    /// Active and not in the middle of an update
    pub ready: bool,
    /// Raw state for messages, e.g. `Pending/InProgress`
    pub detail: String,
    /// Set when the function landed in a failed state
    pub failed: bool,
}

/// Result of a synchronous invocation
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub status_code: i32,
    /// Set by Lambda when the function raised an unhandled error
    pub function_error: Option<String>,
    /// Decoded tail of the execution log
    pub log_tail: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// An IAM role to create
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub name: String,
    pub path: String,
    pub description: String,
    pub trust_policy: String,
    pub max_session_secs: i32,
}

/// Lambda operations the build pipeline needs
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Publish a layer version and return its ARN
    async fn publish_layer(&self, layer: &LayerPublication) -> DeployResult<String>;

    /// ARNs of the layers currently attached to `function`
    async fn layer_arns(&self, function: &str) -> DeployResult<Vec<String>>;

    /// State and last update status of `function`
    async fn function_state(&self, function: &str) -> DeployResult<FunctionState>;

    /// Block until a configuration or code update of `function` has settled
    ///
    /// Lambda rejects further changes with `ResourceConflictException` while
    /// an update is in progress, so every mutation is followed by this.
    async fn wait_until_updated(&self, function: &str, policy: WaitPolicy) -> DeployResult<()> {
        wait_until_ready(self, function, policy, |state| {
            debug!("Waiting for {} ({})", function, state.detail)
        })
        .await
    }

    /// Replace the layers attached to `function`
    async fn set_layers(&self, function: &str, layers: &[String]) -> DeployResult<()>;

    /// Point `function` at a package in S3 and return the new `CodeSha256`
    async fn update_code(&self, function: &str, code: &S3Location) -> DeployResult<String>;

    /// Publish a version of the current code and return the version number
    async fn publish_version(&self, function: &str, code_sha256: &str) -> DeployResult<String>;

    /// Version an alias points at, or None when the alias does not exist
    async fn alias_version(&self, function: &str, alias: &str) -> DeployResult<Option<String>>;

    async fn create_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()>;

    async fn update_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()>;
}

/// Lambda operations the operator CLI needs on top of [`FunctionApi`]
#[async_trait]
pub trait FunctionAdmin: FunctionApi {
    async fn function_exists(&self, function: &str) -> DeployResult<bool>;

    /// Create a function and return its ARN
    async fn create_function(&self, definition: &FunctionDefinition) -> DeployResult<String>;

    /// Apply runtime, handler, role, limits and environment of `definition`
    async fn update_configuration(&self, definition: &FunctionDefinition) -> DeployResult<()>;

    /// Invoke synchronously with the log tail requested
    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> DeployResult<InvokeOutcome>;
}

/// Object storage for function packages
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file
    async fn put_file(&self, location: &S3Location, path: &Path) -> DeployResult<()>;
}

/// IAM operations used when provisioning the bootstrapper
#[async_trait]
pub trait RoleApi: Send + Sync {
    /// ARN of `name`, or None when the role does not exist
    async fn role_arn(&self, name: &str) -> DeployResult<Option<String>>;

    /// Create a role and return its ARN
    async fn create_role(&self, role: &RoleDefinition) -> DeployResult<String>;

    async fn attach_policy(&self, role: &str, policy_arn: &str) -> DeployResult<()>;
}

/// SDK clients sharing one resolved configuration
#[derive(Debug, Clone)]
pub struct AwsClients {
    lambda: aws_sdk_lambda::Client,
    s3: aws_sdk_s3::Client,
    iam: aws_sdk_iam::Client,
    region: Option<String>,
}

impl AwsClients {
    /// Resolve credentials and region from the environment
    ///
    /// `region` overrides the region from the default provider chain.
    pub async fn load(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = loader.load().await;
        let region = shared.region().map(|r| r.to_string());
        debug!("Loaded AWS configuration for region {:?}", region);

        Self {
            lambda: aws_sdk_lambda::Client::new(&shared),
            s3: aws_sdk_s3::Client::new(&shared),
            iam: aws_sdk_iam::Client::new(&shared),
            region,
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn functions(&self) -> LambdaFunctions {
        LambdaFunctions::new(self.lambda.clone())
    }

    pub fn store(&self) -> S3Store {
        S3Store::new(self.s3.clone())
    }

    pub fn roles(&self) -> IamRoles {
        IamRoles::new(self.iam.clone())
    }
}

/// Poll until `function` is active and no update is in progress
///
/// `on_poll` sees every state that is not ready yet. A failed state ends the
/// wait immediately.
pub async fn wait_until_ready<F: FunctionApi + ?Sized>(
    functions: &F,
    function: &str,
    policy: WaitPolicy,
    mut on_poll: impl FnMut(&FunctionState),
) -> DeployResult<()> {
    let mut last = String::from("Unknown");
    for attempt in 0..policy.attempts {
        let state = functions.function_state(function).await?;
        if state.ready {
            return Ok(());
        }
        if state.failed {
            return Err(DeployError::FunctionNotReady {
                name: function.to_string(),
                state: state.detail,
            });
        }
        on_poll(&state);
        last = state.detail;
        if attempt + 1 < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(DeployError::FunctionNotReady {
        name: function.to_string(),
        state: format!("still {} after {} checks", last, policy.attempts),
    })
}

/// Decode the base64 log tail Lambda returns with `LogType::Tail`
pub fn decode_log_tail(encoded: &str) -> DeployResult<String> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| DeployError::aws("decode invocation log", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_log_tail() {
        let encoded = BASE64.encode("START RequestId: 1\nSuccessfully installed dulwich\n");
        let decoded = decode_log_tail(&encoded).unwrap();
        assert!(decoded.contains("Successfully installed dulwich"));
    }

    #[test]
    fn rejects_invalid_log_tail() {
        let err = decode_log_tail("not base64!").unwrap_err();
        assert!(err.to_string().contains("decode invocation log"));
    }

    #[test]
    fn s3_location_display() {
        let loc = S3Location::new("deploys", "orders/lambda_function.zip");
        assert_eq!(loc.to_string(), "s3://deploys/orders/lambda_function.zip");
    }
}
