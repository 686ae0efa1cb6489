//! Source cleanup for move pipelines.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::DEFAULT_MAX_CONCURRENT_ITEMS;
use crate::backend::Storage;
use crate::location::{ItemRef, StorageLocation};
use crate::transfer::{ItemFailure, TransferOutcome};

/// Result of the deletion phase.
#[derive(Debug, Clone, Default)]
pub struct DeletionOutcome {
    pub deleted: Vec<ItemRef>,
    pub failures: Vec<ItemFailure>,
    /// Empty local directories removed after the items were deleted.
    pub pruned_directories: usize,
}

/// Deletes the source side of a completed transfer.
#[derive(Clone)]
pub struct DeletionEngine {
    storage: Storage,
    max_concurrent_items: usize,
}

impl DeletionEngine {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
        }
    }

    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    /// Delete the source items `transferred` reports as copied.
    ///
    /// Items that failed to copy are never touched. For local sources, empty
    /// directories left behind are pruned within the run's scope: each
    /// explicit key, or the whole source when enumerating. The source root
    /// itself is always kept.
    pub async fn delete_source(
        &self,
        source: &StorageLocation,
        explicit_keys: &[String],
        transferred: &TransferOutcome,
    ) -> DeletionOutcome {
        let storage = &self.storage;
        let deletions: Vec<_> = transferred
            .copied
            .iter()
            .map(|p| &p.source)
            .map(|item| async move { (item, storage.backend_for(item).delete_item(item).await) })
            .collect();
        let results: Vec<_> = stream::iter(deletions)
            .buffered(self.max_concurrent_items)
            .collect()
            .await;

        let mut outcome = DeletionOutcome::default();
        for (item, result) in results {
            match result {
                Ok(()) => {
                    info!("Deleted {}", item);
                    outcome.deleted.push(item.clone());
                }
                Err(e) => {
                    warn!("Failed to delete {}: {}", item, e);
                    outcome.failures.push(ItemFailure {
                        item: item.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !source.is_object() {
            outcome.pruned_directories = self.prune(source, explicit_keys).await;
        }
        outcome
    }

    async fn prune(&self, source: &StorageLocation, explicit_keys: &[String]) -> usize {
        let root = source.as_item();
        let scopes: Vec<ItemRef> = if explicit_keys.is_empty() {
            vec![root.clone()]
        } else {
            explicit_keys.iter().map(|key| source.child(key)).collect()
        };

        let mut pruned = 0;
        for scope in scopes {
            let keep_scope = scope == root;
            match self
                .storage
                .backend_for(&scope)
                .prune_empty_containers(&scope, keep_scope)
                .await
            {
                Ok(count) => pruned += count,
                Err(e) => warn!("Failed to prune empty directories under {}: {}", scope, e),
            }
        }
        pruned
    }
}

#[cfg(test)]
#[path = "deletion_tests.rs"]
mod tests;
