//! Bootstrapper function entry point
//!
//! Runs inside AWS Lambda and answers `setup` and `build` invocations.

use lambda_lambda::aws::{AwsClients, FunctionApi, ObjectStore};
use lambda_lambda::config::HandlerConfig;
use lambda_lambda::error::DeployError;
use lambda_lambda::event::Response;
use lambda_lambda::git::{GitClient, Libgit2Client};
use lambda_lambda::handler::Deployer;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lambda_lambda=info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let deployer = match HandlerConfig::from_env() {
        Ok(config) => {
            let clients = AwsClients::load(config.region.as_deref()).await;
            info!(bootstrapper = %config.bootstrapper, bucket = %config.deploy_bucket, "Cold start");
            Ok(Deployer::new(
                config,
                Arc::new(clients.functions()) as Arc<dyn FunctionApi>,
                Arc::new(clients.store()) as Arc<dyn ObjectStore>,
                Arc::new(Libgit2Client::new()) as Arc<dyn GitClient>,
            ))
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    };

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| {
        handle(&deployer, event)
    }))
    .await
}

async fn handle(
    deployer: &Result<Deployer, DeployError>,
    event: LambdaEvent<Value>,
) -> Result<Response, Error> {
    info!(request_id = %event.context.request_id, "Invocation");
    Ok(match deployer {
        Ok(deployer) => deployer.handle(event.payload).await,
        Err(e) => Response::from_error(e),
    })
}
