//! Storage backends and the router that picks one per location.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::location::{ItemRef, StorageLocation};
use crate::object_store::ObjectStore;

mod local;
mod object;

pub use local::LocalBackend;
pub use object::ObjectBackend;

/// Kind of an enumerated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

/// An entry found while enumerating a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    /// The entry itself.
    pub item: ItemRef,
    /// Path of the entry relative to the enumerated location, `/`-separated.
    /// Empty when the location is itself a single file.
    pub relative: String,
    pub kind: ItemKind,
}

/// Capabilities a storage backend offers to the transfer and deletion engines.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Enumerate everything under `location` in a deterministic order.
    ///
    /// Fails when the location itself cannot be listed.
    async fn list(&self, location: &StorageLocation) -> StorageResult<Vec<ListedItem>>;

    /// Copy one item within this backend, replacing the target.
    async fn copy_item(&self, source: &ItemRef, target: &ItemRef) -> StorageResult<()>;

    /// Delete one item.
    async fn delete_item(&self, item: &ItemRef) -> StorageResult<()>;

    /// Read an item's bytes (source side of a cross-backend copy).
    async fn read_item(&self, item: &ItemRef) -> StorageResult<Vec<u8>>;

    /// Write an item's bytes (target side of a cross-backend copy).
    async fn write_item(&self, item: &ItemRef, body: Vec<u8>) -> StorageResult<()>;

    /// Make sure a container item (directory) exists.
    async fn prepare_container(&self, item: &ItemRef) -> StorageResult<()>;

    /// Remove empty containers below `scope`, children before parents.
    ///
    /// `scope` itself is removed only when `keep_scope` is false. Returns the
    /// number of containers removed.
    async fn prune_empty_containers(&self, scope: &ItemRef, keep_scope: bool)
    -> StorageResult<usize>;
}

/// Routes items to the local or the object backend.
#[derive(Clone)]
pub struct Storage {
    local: Arc<dyn StorageBackend>,
    object: Arc<dyn StorageBackend>,
}

impl Storage {
    /// Create a router from explicit backends.
    pub fn new(local: Arc<dyn StorageBackend>, object: Arc<dyn StorageBackend>) -> Self {
        Self { local, object }
    }

    /// Local filesystem plus the given object store.
    pub fn with_object_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(Arc::new(LocalBackend::new()), Arc::new(ObjectBackend::new(store)))
    }

    /// Backend serving a location.
    pub fn backend_for_location(&self, location: &StorageLocation) -> &dyn StorageBackend {
        if location.is_object() {
            self.object.as_ref()
        } else {
            self.local.as_ref()
        }
    }

    /// Backend serving an item.
    pub fn backend_for(&self, item: &ItemRef) -> &dyn StorageBackend {
        if item.is_object() {
            self.object.as_ref()
        } else {
            self.local.as_ref()
        }
    }

    /// Copy one item, across backends if needed.
    ///
    /// Same-backend copies use the backend's native copy. Mixed copies read
    /// the whole item from the source backend and write it to the target.
    pub async fn copy(&self, source: &ItemRef, target: &ItemRef) -> StorageResult<()> {
        if source.is_object() == target.is_object() {
            return self.backend_for(source).copy_item(source, target).await;
        }
        let body = self.backend_for(source).read_item(source).await?;
        self.backend_for(target).write_item(target, body).await
    }
}
