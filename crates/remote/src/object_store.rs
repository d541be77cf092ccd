//! Object store holding uploaded item contents, keyed by content hash.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;

use crate::error::RemoteError;

/// Prefix of every content object in the bucket.
const CONTENTS_PREFIX: &str = "contents/";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the content with this hash was uploaded.
    async fn exists(&self, hash: &str) -> Result<bool, RemoteError>;

    /// The subset of `hashes` that were not uploaded, in input order.
    async fn missing(&self, hashes: &[String]) -> Result<Vec<String>, RemoteError> {
        let checks = hashes.iter().map(|hash| async move {
            self.exists(hash).await.map(|found| (hash, found))
        });
        let results = futures::future::try_join_all(checks).await?;
        Ok(results
            .into_iter()
            .filter(|(_, found)| !found)
            .map(|(hash, _)| hash.clone())
            .collect())
    }
}

/// Bound on a whole S3 call, retries included.
fn timeout_config(timeout: Duration) -> TimeoutConfig {
    TimeoutConfig::builder().operation_timeout(timeout).build()
}

/// S3 implementation; credentials and region come from the environment.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn from_env(bucket: impl Into<String>, timeout: Duration) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(timeout_config(timeout))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    fn key(hash: &str) -> String {
        format!("{CONTENTS_PREFIX}{hash}")
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, hash: &str) -> Result<bool, RemoteError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(Self::key(hash))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => {
                tracing::error!(error = %err, hash, "S3 head_object failed");
                Err(RemoteError::Storage(err.to_string()))
            }
        }
    }
}
