//! S3 upload client

use super::{ObjectStore, S3Location};
use crate::error::{DeployError, DeployResult};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

/// [`ObjectStore`] backed by the S3 SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, location: &S3Location, path: &Path) -> DeployResult<()> {
        info!("Uploading {} to {}", path.display(), location);
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| DeployError::aws(format!("read {}", path.display()), e))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body)
            .send()
            .await
            .map_err(|e| DeployError::aws("upload package", DisplayErrorContext(e)))?;
        Ok(())
    }
}
