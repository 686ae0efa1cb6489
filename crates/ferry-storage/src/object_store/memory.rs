//! In-memory object store.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ObjectPage, ObjectStore};
use crate::error::{StorageError, StorageResult};

/// In-memory object store for testing and dry runs.
///
/// Listings are paginated with a configurable page size so callers exercise
/// continuation handling the same way they would against S3.
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    page_size: usize,
    failing_keys: HashSet<String>,
}

impl MemoryObjectStore {
    /// Create an empty store with a page size of 1000.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: 1000,
            failing_keys: HashSet::new(),
        }
    }

    /// Set the maximum number of keys per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every request touching `key` fail.
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Store an object.
    pub async fn insert(&self, container: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut objects = self.objects.write().await;
        objects.insert((container.to_string(), key.to_string()), body.into());
    }

    /// Read an object.
    pub async fn get(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.read().await;
        objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in a container, sorted.
    pub async fn keys(&self, container: &str) -> Vec<String> {
        let objects = self.objects.read().await;
        objects
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect()
    }

    fn check(&self, container: &str, key: &str) -> StorageResult<()> {
        if self.failing_keys.contains(key) {
            return Err(StorageError::object(container, key, "injected failure"));
        }
        Ok(())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> StorageResult<ObjectPage> {
        self.check(container, prefix)?;
        let objects = self.objects.read().await;

        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(c, k)| c == container && k.starts_with(prefix))
            .filter(|(_, k)| continuation.as_ref().is_none_or(|after| k > after))
            .map(|(_, k)| k.clone())
            .take(self.page_size + 1)
            .collect();

        let next_continuation = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation,
        })
    }

    async fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
    ) -> StorageResult<()> {
        self.check(source_container, source_key)?;
        self.check(target_container, target_key)?;

        let mut objects = self.objects.write().await;
        let body = objects
            .get(&(source_container.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| {
                StorageError::NotFound(format!("s3://{}/{}", source_container, source_key))
            })?;
        objects.insert((target_container.to_string(), target_key.to_string()), body);
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()> {
        self.check(container, key)?;
        let mut objects = self.objects.write().await;
        objects.remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.check(container, key)?;
        self.get(container, key)
            .await
            .ok_or_else(|| StorageError::NotFound(format!("s3://{}/{}", container, key)))
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.check(container, key)?;
        self.insert(container, key, body).await;
        Ok(())
    }
}
