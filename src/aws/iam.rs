//! IAM role client

use super::{RoleApi, RoleDefinition};
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::Client;
use tracing::info;

/// [`RoleApi`] backed by the IAM SDK
#[derive(Debug, Clone)]
pub struct IamRoles {
    client: Client,
}

impl IamRoles {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleApi for IamRoles {
    async fn role_arn(&self, name: &str) -> DeployResult<Option<String>> {
        match self.client.get_role().role_name(name).send().await {
            Ok(output) => Ok(output.role().map(|role| role.arn().to_string())),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_no_such_entity_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(DeployError::aws("get role", DisplayErrorContext(e))),
        }
    }

    async fn create_role(&self, role: &RoleDefinition) -> DeployResult<String> {
        info!("Creating IAM role {}{}", role.path, role.name);
        let output = self
            .client
            .create_role()
            .role_name(&role.name)
            .path(&role.path)
            .description(&role.description)
            .assume_role_policy_document(&role.trust_policy)
            .max_session_duration(role.max_session_secs)
            .send()
            .await
            .map_err(|e| DeployError::aws("create role", DisplayErrorContext(e)))?;

        output
            .role()
            .map(|r| r.arn().to_string())
            .ok_or(DeployError::MissingResponseField {
                operation: "CreateRole",
                field: "Role",
            })
    }

    async fn attach_policy(&self, role: &str, policy_arn: &str) -> DeployResult<()> {
        info!("Attaching {} to {}", policy_arn, role);
        self.client
            .attach_role_policy()
            .role_name(role)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| DeployError::aws("attach role policy", DisplayErrorContext(e)))?;
        Ok(())
    }
}
