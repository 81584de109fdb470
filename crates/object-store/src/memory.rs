//! In-memory object store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::{Result, StoreError};
use crate::ObjectStore;

type Buckets = HashMap<String, BTreeMap<String, Vec<u8>>>;

/// An object store kept entirely in memory.
///
/// Buckets must be created before use, like a real deployment. An optional
/// size limit reproduces the single-request upload ceiling, and an optional
/// put delay widens the window between the existence check and the write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    max_object_size: Option<usize>,
    put_delay: Duration,
    puts: AtomicUsize,
}

impl MemoryStore {
    /// Create a store with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one empty bucket.
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        let store = Self::new();
        store.create_bucket(bucket);
        store
    }

    /// Reject objects larger than `bytes`.
    pub fn with_max_object_size(mut self, bytes: usize) -> Self {
        self.max_object_size = Some(bytes);
        self
    }

    /// Sleep before every write.
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    /// Create an empty bucket. Existing buckets are left untouched.
    pub fn create_bucket(&self, bucket: impl Into<String>) {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.entry(bucket.into()).or_default();
        }
    }

    /// Read an object back.
    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let buckets = self.buckets.lock().ok()?;
        buckets.get(bucket)?.get(key).cloned()
    }

    /// Number of objects in a bucket.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .ok()
            .and_then(|b| b.get(bucket).map(BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Buckets>> {
        self.buckets
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let buckets = self.lock()?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketMissing(bucket.to_string()))?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        if !self.put_delay.is_zero() {
            sleep(self.put_delay).await;
        }

        if let Some(max) = self.max_object_size {
            if data.len() > max {
                return Err(StoreError::EntityTooLarge {
                    key: key.to_string(),
                });
            }
        }

        let mut buckets = self.lock()?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketMissing(bucket.to_string()))?;
        objects.insert(key.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_until_exists(&self, bucket: &str, key: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let exists = {
                let buckets = self.lock()?;
                let objects = buckets
                    .get(bucket)
                    .ok_or_else(|| StoreError::BucketMissing(bucket.to_string()))?;
                objects.contains_key(key)
            };
            if exists {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StoreError::Timeout {
                    key: key.to_string(),
                });
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
