//! Operator-side provisioning of the bootstrapper function
//!
//! Packages the `bootstrap` executable, makes sure the execution role
//! exists, creates or updates the function, waits for it to settle and
//! triggers the one-time `setup` invocation.

use crate::aws::{
    self, FunctionAdmin, FunctionApi, FunctionDefinition, FunctionState, InvokeOutcome,
    ObjectStore, RoleApi, RoleDefinition, S3Location,
};
use crate::error::{DeployError, DeployResult};
use crate::event::{InvocationEvent, Response};
use crate::package::{ArchiveInfo, Archiver};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, info};

pub use crate::aws::WaitPolicy;

/// Archive name of the bootstrapper package, locally and in the bucket
pub const BOOTSTRAP_ARCHIVE: &str = "lambda-function.zip";

/// Executable inside the package
pub const BOOTSTRAP_ENTRY: &str = "bootstrap";

/// Managed runtime the bootstrapper runs on
///
/// Builds shell out to pip, which only the Python runtimes ship. The
/// `bootstrap` executable takes over the runtime API through
/// `AWS_LAMBDA_EXEC_WRAPPER`, so the handler name is never used.
pub const BOOTSTRAP_RUNTIME: &str = "python3.12";

/// Directory Lambda extracts the package into
pub const TASK_ROOT: &str = "/var/task";

/// pip of the runtime's own interpreter
pub const RUNTIME_PIP_COMMAND: &str = "python3 -m pip";

pub const ROLE_PATH: &str = "/service-role/";

/// Managed policies attached to a newly created role
pub const MANAGED_POLICIES: &[&str] = &[
    "arn:aws:iam::aws:policy/AWSLambda_FullAccess",
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole",
    "arn:aws:iam::aws:policy/AmazonS3FullAccess",
];

const FUNCTION_DESCRIPTION: &str =
    "a Lambda function that can build and deploy other Lambda functions";
const ROLE_DESCRIPTION: &str = "allows Lambda function access to S3 and CloudWatch logs";

/// What to provision
#[derive(Debug, Clone)]
pub struct BootstrapperSpec {
    pub function: String,
    pub bucket: String,
    pub timeout_secs: i32,
    pub memory_mb: i32,
    /// Function environment besides `deploy_bucket` and the runtime settings
    pub environment: Vec<(&'static str, String)>,
}

impl BootstrapperSpec {
    /// Where the bootstrapper package lives in the bucket
    pub fn package_location(&self) -> S3Location {
        S3Location::new(
            &self.bucket,
            format!("{}/{}", self.function, BOOTSTRAP_ARCHIVE),
        )
    }

    fn environment(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = self
            .environment
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        env.insert("deploy_bucket".to_string(), self.bucket.clone());
        env.insert(
            "AWS_LAMBDA_EXEC_WRAPPER".to_string(),
            format!("{}/{}", TASK_ROOT, BOOTSTRAP_ENTRY),
        );
        env.insert("pip_command".to_string(), RUNTIME_PIP_COMMAND.to_string());
        env
    }

    fn definition(&self, role_arn: &str, code: &S3Location) -> FunctionDefinition {
        FunctionDefinition {
            name: self.function.clone(),
            role_arn: role_arn.to_string(),
            runtime: BOOTSTRAP_RUNTIME.to_string(),
            handler: BOOTSTRAP_ENTRY.to_string(),
            description: FUNCTION_DESCRIPTION.to_string(),
            timeout_secs: self.timeout_secs,
            memory_mb: self.memory_mb,
            code: code.clone(),
            environment: self.environment(),
        }
    }
}

/// Role lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOutcome {
    pub arn: String,
    pub created: bool,
}

/// Whether the function was created or had its code replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOutcome {
    Created { arn: String },
    Updated { code_sha256: String },
}

/// Trust policy letting Lambda assume the role
pub fn trust_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"Service": ["lambda.amazonaws.com"]},
            "Action": ["sts:AssumeRole"]
        }]
    })
    .to_string()
}

/// Drives the provisioning steps against the cloud APIs
pub struct Provisioner<'a> {
    functions: &'a dyn FunctionAdmin,
    store: &'a dyn ObjectStore,
    roles: &'a dyn RoleApi,
    update_wait: WaitPolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        functions: &'a dyn FunctionAdmin,
        store: &'a dyn ObjectStore,
        roles: &'a dyn RoleApi,
    ) -> Self {
        Self {
            functions,
            store,
            roles,
            update_wait: WaitPolicy::default(),
        }
    }

    /// Limits for waiting between the code and configuration updates
    pub fn with_update_wait(mut self, policy: WaitPolicy) -> Self {
        self.update_wait = policy;
        self
    }

    /// Zip the `bootstrap` executable into `work_dir` and upload it
    pub async fn upload_package(
        &self,
        spec: &BootstrapperSpec,
        binary: &Path,
        work_dir: &Path,
    ) -> DeployResult<(S3Location, ArchiveInfo)> {
        let archive = package_binary(binary, &work_dir.join(BOOTSTRAP_ARCHIVE)).await?;
        let location = spec.package_location();
        self.store.put_file(&location, &archive.path).await?;
        Ok((location, archive))
    }

    /// Look up the execution role, creating it when missing
    pub async fn ensure_role(&self, name: &str) -> DeployResult<RoleOutcome> {
        if let Some(arn) = self.roles.role_arn(name).await? {
            debug!("Found role {}", arn);
            return Ok(RoleOutcome {
                arn,
                created: false,
            });
        }

        self.roles
            .create_role(&RoleDefinition {
                name: name.to_string(),
                path: ROLE_PATH.to_string(),
                description: ROLE_DESCRIPTION.to_string(),
                trust_policy: trust_policy(),
                max_session_secs: 3600,
            })
            .await?;
        for policy in MANAGED_POLICIES {
            self.roles.attach_policy(name, policy).await?;
        }

        let arn = self
            .roles
            .role_arn(name)
            .await?
            .ok_or_else(|| DeployError::RoleNotFound(name.to_string()))?;
        Ok(RoleOutcome { arn, created: true })
    }

    /// Create the function, or point an existing one at the new package
    ///
    /// An existing function also gets its runtime, limits and environment
    /// brought in line with `spec`.
    pub async fn deploy_function(
        &self,
        spec: &BootstrapperSpec,
        role_arn: &str,
        code: &S3Location,
    ) -> DeployResult<FunctionOutcome> {
        let definition = spec.definition(role_arn, code);

        if self.functions.function_exists(&spec.function).await? {
            info!("Updating {} with latest code", spec.function);
            let code_sha256 = self.functions.update_code(&spec.function, code).await?;
            self.functions
                .wait_until_updated(&spec.function, self.update_wait)
                .await?;
            self.functions.update_configuration(&definition).await?;
            return Ok(FunctionOutcome::Updated { code_sha256 });
        }

        info!("Creating {} Lambda function", spec.function);
        let arn = self.functions.create_function(&definition).await?;
        Ok(FunctionOutcome::Created { arn })
    }

    /// Poll until the function is active and no update is in progress
    ///
    /// `on_poll` sees every state that is not ready yet.
    pub async fn wait_until_ready(
        &self,
        function: &str,
        policy: WaitPolicy,
        on_poll: impl FnMut(&FunctionState),
    ) -> DeployResult<()> {
        aws::wait_until_ready(self.functions, function, policy, on_poll).await
    }

    /// Trigger the `setup` action on the bootstrapper
    pub async fn invoke_setup(&self, function: &str) -> DeployResult<(InvokeOutcome, Response)> {
        let event = InvocationEvent {
            function: function.to_string(),
            action: "setup".to_string(),
            ..InvocationEvent::default()
        };
        invoke_bootstrapper(self.functions, function, &event).await
    }
}

/// Zip a single executable as the `bootstrap` entry
pub async fn package_binary(binary: &Path, archive: &Path) -> DeployResult<ArchiveInfo> {
    let binary: PathBuf = binary.to_path_buf();
    let archive: PathBuf = archive.to_path_buf();
    task::spawn_blocking(move || Archiver::zip_file(&binary, BOOTSTRAP_ENTRY, &archive))
        .await
        .map_err(|e| DeployError::Internal(format!("archive task failed: {e}")))?
}

/// Invoke `bootstrapper` with `event` and interpret its response
///
/// A function error or a non-200 status code is a [`DeployError::RemoteBuild`].
pub async fn invoke_bootstrapper(
    functions: &dyn FunctionAdmin,
    bootstrapper: &str,
    event: &InvocationEvent,
) -> DeployResult<(InvokeOutcome, Response)> {
    let payload = serde_json::to_value(event)?;
    let outcome = functions.invoke(bootstrapper, &payload).await?;
    let response = remote_response(&outcome)?;
    Ok((outcome, response))
}

/// The bootstrapper's `{statusCode, body}` reply, failing on any error
pub fn remote_response(outcome: &InvokeOutcome) -> DeployResult<Response> {
    if let Some(kind) = &outcome.function_error {
        let body = outcome
            .payload
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        return Err(DeployError::RemoteBuild {
            status: 500,
            body: format!("{}: {}", kind, body),
        });
    }

    let payload = outcome.payload.clone().ok_or(DeployError::MissingResponseField {
        operation: "Invoke",
        field: "Payload",
    })?;
    let response: Response = serde_json::from_value(payload)?;
    if !response.is_success() {
        return Err(DeployError::RemoteBuild {
            status: response.status_code,
            body: response.body,
        });
    }
    Ok(response)
}
