//! Object-store backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ItemKind, ListedItem, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::location::{ItemRef, StorageLocation};
use crate::object_store::ObjectStore;

/// Backend over a flat object namespace. Folder marker keys are listed as
/// directories, but nothing needs creating or pruning.
#[derive(Clone)]
pub struct ObjectBackend {
    store: Arc<dyn ObjectStore>,
}

impl ObjectBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

fn object_parts(item: &ItemRef) -> StorageResult<(&str, &str)> {
    match item {
        ItemRef::Object { container, key } => Ok((container, key)),
        ItemRef::Local(path) => Err(StorageError::InvalidLocation(format!(
            "object backend cannot serve {}",
            path.display()
        ))),
    }
}

#[async_trait]
impl StorageBackend for ObjectBackend {
    async fn list(&self, location: &StorageLocation) -> StorageResult<Vec<ListedItem>> {
        let (container, prefix) = match location {
            StorageLocation::Object {
                container,
                key_prefix,
            } => (container.as_str(), key_prefix.as_str()),
            other => {
                return Err(StorageError::InvalidLocation(format!(
                    "object backend cannot list {}",
                    other
                )));
            }
        };

        let mut keys = Vec::new();
        let mut continuation = None;
        loop {
            let page = self
                .store
                .list_objects(container, prefix, continuation)
                .await?;
            keys.extend(page.keys);
            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        keys.sort();
        debug!("Listed {} objects under {}", keys.len(), location);

        Ok(keys
            .into_iter()
            .filter_map(|key| {
                let relative = key.strip_prefix(prefix).unwrap_or(&key);
                // Zero-byte folder markers end with `/`.
                let (relative, kind) = if key.ends_with('/') {
                    match relative.trim_end_matches('/') {
                        "" => return None,
                        folder => (folder.to_string(), ItemKind::Directory),
                    }
                } else {
                    (relative.to_string(), ItemKind::File)
                };
                Some(ListedItem {
                    relative,
                    item: ItemRef::Object {
                        container: container.to_string(),
                        key,
                    },
                    kind,
                })
            })
            .collect())
    }

    async fn copy_item(&self, source: &ItemRef, target: &ItemRef) -> StorageResult<()> {
        let (source_container, source_key) = object_parts(source)?;
        let (target_container, target_key) = object_parts(target)?;
        self.store
            .copy_object(source_container, source_key, target_container, target_key)
            .await
    }

    async fn delete_item(&self, item: &ItemRef) -> StorageResult<()> {
        let (container, key) = object_parts(item)?;
        self.store.delete_object(container, key).await
    }

    async fn read_item(&self, item: &ItemRef) -> StorageResult<Vec<u8>> {
        let (container, key) = object_parts(item)?;
        self.store.get_object(container, key).await
    }

    async fn write_item(&self, item: &ItemRef, body: Vec<u8>) -> StorageResult<()> {
        let (container, key) = object_parts(item)?;
        self.store.put_object(container, key, body).await
    }

    async fn prepare_container(&self, item: &ItemRef) -> StorageResult<()> {
        object_parts(item).map(|_| ())
    }

    async fn prune_empty_containers(
        &self,
        scope: &ItemRef,
        _keep_scope: bool,
    ) -> StorageResult<usize> {
        object_parts(scope).map(|_| 0)
    }
}
