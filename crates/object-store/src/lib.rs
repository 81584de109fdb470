//! Object storage for archived message content.
//!
//! The archiver only needs four things from a bucket: list keys under a
//! prefix, put an object, wait for a new key to become visible, and a name
//! for logging. [`ObjectStore`] captures exactly that, with an S3 backend
//! for production and an in-memory backend for tests.

mod error;
mod memory;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Default time to wait for a freshly uploaded key to become visible.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// A bucket-oriented object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every key in `bucket` starting with `prefix`.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Store `data` at `key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Block until `key` is visible to readers or `timeout` elapses.
    async fn wait_until_exists(&self, bucket: &str, key: &str, timeout: Duration) -> Result<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        (**self).list_keys(bucket, prefix).await
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        (**self).put_object(bucket, key, data).await
    }

    async fn wait_until_exists(&self, bucket: &str, key: &str, timeout: Duration) -> Result<()> {
        (**self).wait_until_exists(bucket, key, timeout).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
