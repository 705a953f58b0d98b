//! Lambda API client

use super::{
    decode_log_tail, FunctionAdmin, FunctionApi, FunctionDefinition, FunctionState,
    InvokeOutcome, LayerPublication, S3Location,
};
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{
    Environment, FunctionCode, InvocationType, LastUpdateStatus, LayerVersionContentInput,
    LogType, Runtime, State,
};
use aws_sdk_lambda::Client;
use tracing::{debug, info};

/// [`FunctionApi`] and [`FunctionAdmin`] backed by the Lambda SDK
#[derive(Debug, Clone)]
pub struct LambdaFunctions {
    client: Client,
}

impl LambdaFunctions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionApi for LambdaFunctions {
    async fn publish_layer(&self, layer: &LayerPublication) -> DeployResult<String> {
        info!("Publishing layer {} ({} bytes)", layer.name, layer.zip.len());

        let content = LayerVersionContentInput::builder()
            .zip_file(Blob::new(layer.zip.clone()))
            .build();
        let runtimes = layer.runtimes.iter().map(|r| Runtime::from(r.as_str())).collect();

        let output = self
            .client
            .publish_layer_version()
            .layer_name(&layer.name)
            .description(&layer.description)
            .content(content)
            .set_compatible_runtimes(Some(runtimes))
            .set_license_info(layer.license.clone())
            .send()
            .await
            .map_err(|e| DeployError::aws("publish layer version", DisplayErrorContext(e)))?;

        let arn = output
            .layer_version_arn()
            .ok_or(DeployError::MissingResponseField {
                operation: "PublishLayerVersion",
                field: "LayerVersionArn",
            })?;
        info!("Published {}", arn);
        Ok(arn.to_string())
    }

    async fn layer_arns(&self, function: &str) -> DeployResult<Vec<String>> {
        let output = self
            .client
            .get_function_configuration()
            .function_name(function)
            .send()
            .await
            .map_err(|e| {
                DeployError::aws("get function configuration", DisplayErrorContext(e))
            })?;

        Ok(output
            .layers()
            .iter()
            .filter_map(|layer| layer.arn().map(str::to_string))
            .collect())
    }

    async fn function_state(&self, function: &str) -> DeployResult<FunctionState> {
        let output = self
            .client
            .get_function_configuration()
            .function_name(function)
            .send()
            .await
            .map_err(|e| {
                DeployError::aws("get function configuration", DisplayErrorContext(e))
            })?;

        let state = output.state();
        let update = output.last_update_status();
        // Functions created before state tracking report neither field
        let ready = matches!(state, None | Some(State::Active))
            && !matches!(update, Some(LastUpdateStatus::InProgress));
        let failed = matches!(state, Some(State::Failed))
            || matches!(update, Some(LastUpdateStatus::Failed));

        Ok(FunctionState {
            ready,
            failed,
            detail: format!(
                "{}/{}",
                state.map(|s| s.as_str()).unwrap_or("Unknown"),
                update.map(|s| s.as_str()).unwrap_or("Unknown")
            ),
        })
    }

    async fn set_layers(&self, function: &str, layers: &[String]) -> DeployResult<()> {
        debug!("Setting layers of {}: {:?}", function, layers);
        self.client
            .update_function_configuration()
            .function_name(function)
            .set_layers(Some(layers.to_vec()))
            .send()
            .await
            .map_err(|e| {
                DeployError::aws("update function configuration", DisplayErrorContext(e))
            })?;
        Ok(())
    }

    async fn update_code(&self, function: &str, code: &S3Location) -> DeployResult<String> {
        info!("Updating code of {} from {}", function, code);
        let output = self
            .client
            .update_function_code()
            .function_name(function)
            .s3_bucket(&code.bucket)
            .s3_key(&code.key)
            .send()
            .await
            .map_err(|e| DeployError::aws("update function code", DisplayErrorContext(e)))?;

        output
            .code_sha256()
            .map(str::to_string)
            .ok_or(DeployError::MissingResponseField {
                operation: "UpdateFunctionCode",
                field: "CodeSha256",
            })
    }

    async fn publish_version(&self, function: &str, code_sha256: &str) -> DeployResult<String> {
        let output = self
            .client
            .publish_version()
            .function_name(function)
            .code_sha256(code_sha256)
            .send()
            .await
            .map_err(|e| DeployError::aws("publish version", DisplayErrorContext(e)))?;

        output
            .version()
            .map(str::to_string)
            .ok_or(DeployError::MissingResponseField {
                operation: "PublishVersion",
                field: "Version",
            })
    }

    async fn alias_version(&self, function: &str, alias: &str) -> DeployResult<Option<String>> {
        match self
            .client
            .get_alias()
            .function_name(function)
            .name(alias)
            .send()
            .await
        {
            Ok(output) => Ok(output.function_version().map(str::to_string)),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(DeployError::aws("get alias", DisplayErrorContext(e))),
        }
    }

    async fn create_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()> {
        self.client
            .create_alias()
            .function_name(function)
            .name(alias)
            .function_version(version)
            .send()
            .await
            .map_err(|e| DeployError::aws("create alias", DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn update_alias(&self, function: &str, alias: &str, version: &str) -> DeployResult<()> {
        self.client
            .update_alias()
            .function_name(function)
            .name(alias)
            .function_version(version)
            .send()
            .await
            .map_err(|e| DeployError::aws("update alias", DisplayErrorContext(e)))?;
        Ok(())
    }
}

#[async_trait]
impl FunctionAdmin for LambdaFunctions {
    async fn function_exists(&self, function: &str) -> DeployResult<bool> {
        match self.client.get_function().function_name(function).send().await {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(e) => Err(DeployError::aws("get function", DisplayErrorContext(e))),
        }
    }

    async fn create_function(&self, definition: &FunctionDefinition) -> DeployResult<String> {
        let code = FunctionCode::builder()
            .s3_bucket(&definition.code.bucket)
            .s3_key(&definition.code.key)
            .build();
        let output = self
            .client
            .create_function()
            .function_name(&definition.name)
            .role(&definition.role_arn)
            .runtime(Runtime::from(definition.runtime.as_str()))
            .handler(&definition.handler)
            .description(&definition.description)
            .timeout(definition.timeout_secs)
            .memory_size(definition.memory_mb)
            .code(code)
            .environment(environment(definition))
            .publish(true)
            .send()
            .await
            .map_err(|e| DeployError::aws("create function", DisplayErrorContext(e)))?;

        output
            .function_arn()
            .map(str::to_string)
            .ok_or(DeployError::MissingResponseField {
                operation: "CreateFunction",
                field: "FunctionArn",
            })
    }

    async fn update_configuration(&self, definition: &FunctionDefinition) -> DeployResult<()> {
        info!("Updating configuration of {}", definition.name);
        self.client
            .update_function_configuration()
            .function_name(&definition.name)
            .role(&definition.role_arn)
            .runtime(Runtime::from(definition.runtime.as_str()))
            .handler(&definition.handler)
            .description(&definition.description)
            .timeout(definition.timeout_secs)
            .memory_size(definition.memory_mb)
            .environment(environment(definition))
            .send()
            .await
            .map_err(|e| {
                DeployError::aws("update function configuration", DisplayErrorContext(e))
            })?;
        Ok(())
    }

    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> DeployResult<InvokeOutcome> {
        info!("Invoking {}", function);
        let body = serde_json::to_vec(payload)?;

        let output = self
            .client
            .invoke()
            .function_name(function)
            .invocation_type(InvocationType::RequestResponse)
            .log_type(LogType::Tail)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|e| DeployError::aws("invoke function", DisplayErrorContext(e)))?;

        let log_tail = output.log_result().map(decode_log_tail).transpose()?;
        let payload = match output.payload() {
            Some(blob) if !blob.as_ref().is_empty() => Some(serde_json::from_slice(blob.as_ref())?),
            _ => None,
        };

        Ok(InvokeOutcome {
            status_code: output.status_code(),
            function_error: output.function_error().map(str::to_string),
            log_tail,
            payload,
        })
    }
}

fn environment(definition: &FunctionDefinition) -> Environment {
    Environment::builder()
        .set_variables(Some(definition.environment.clone().into_iter().collect()))
        .build()
}
