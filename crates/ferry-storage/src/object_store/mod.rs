//! Object store client abstraction.

use async_trait::async_trait;

use crate::error::StorageResult;

mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3Settings};

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Keys in this page, in the order returned by the store.
    pub keys: Vec<String>,
    /// Token to request the next page; `None` once the listing is exhausted.
    pub next_continuation: Option<String>,
}

/// Minimal object-store client used by the object backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`.
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> StorageResult<ObjectPage>;

    /// Server-side copy of one object.
    async fn copy_object(
        &self,
        source_container: &str,
        source_key: &str,
        target_container: &str,
        target_key: &str,
    ) -> StorageResult<()>;

    /// Delete one object.
    async fn delete_object(&self, container: &str, key: &str) -> StorageResult<()>;

    /// Download one object.
    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Upload one object, replacing any existing one.
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;
}
