//! Amazon S3 backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::client::Waiters;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::ObjectStore;

/// An [`ObjectStore`] backed by S3 (or any S3-compatible service).
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Wrap an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment
    /// (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, profiles, `AWS_ENDPOINT_URL`, ...).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        info!(
            "S3 store configured (region: {})",
            config.region().map(|r| r.as_ref()).unwrap_or("default")
        );
        Self::new(Client::new(&config))
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map an SDK error by its S3 error code.
fn classify<E>(err: E, bucket: &str, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err.code() {
        Some("NoSuchBucket") => StoreError::BucketMissing(bucket.to_string()),
        Some("EntityTooLarge") => StoreError::EntityTooLarge {
            key: key.to_string(),
        },
        _ => StoreError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify(e, bucket, prefix))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        debug!("Listed {} keys under {}/{}", keys.len(), bucket, prefix);
        Ok(keys)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        debug!("Put {} bytes at {}/{}", size, bucket, key);
        Ok(())
    }

    async fn wait_until_exists(&self, bucket: &str, key: &str, timeout: Duration) -> Result<()> {
        self.client
            .wait_until_object_exists()
            .bucket(bucket)
            .key(key)
            .wait(timeout)
            .await
            .map_err(|e| match e {
                aws_sdk_s3::waiters::object_exists::WaitUntilObjectExistsError::ExceededMaxWait(_) => {
                    StoreError::Timeout {
                        key: key.to_string(),
                    }
                }
                other => StoreError::Backend(DisplayErrorContext(&other).to_string()),
            })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "s3"
    }
}
