//! Transfer engine: resolves a batch of items and copies it.

use std::path::{Component, Path};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::DEFAULT_MAX_CONCURRENT_ITEMS;
use crate::backend::{ItemKind, ListedItem, Storage};
use crate::error::{StorageError, StorageResult};
use crate::location::{ItemRef, StorageLocation};

/// A source item and the target it is copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPair {
    pub source: ItemRef,
    pub target: ItemRef,
}

/// An item that could not be processed. The batch carries on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Rendered item reference.
    pub item: String,
    pub error: String,
}

impl ItemFailure {
    fn new(item: &ItemRef, error: &StorageError) -> Self {
        Self {
            item: item.to_string(),
            error: error.to_string(),
        }
    }
}

/// Everything resolved for one run before any copy starts.
#[derive(Debug, Clone, Default)]
pub struct TransferBatch {
    /// Target directories to create before copying, parents first.
    pub directories: Vec<ItemRef>,
    /// Items to copy, in execution order.
    pub pairs: Vec<TransferPair>,
    /// Explicit keys that could not be resolved.
    pub failures: Vec<ItemFailure>,
}

impl TransferBatch {
    /// Add a listed entry, mapping its relative path onto the target with `map`.
    ///
    /// Entries whose relative path would leave a local target are recorded
    /// as failures instead.
    fn push_listed<F>(&mut self, entry: ListedItem, target_is_local: bool, map: F)
    where
        F: FnOnce(&str) -> ItemRef,
    {
        if target_is_local {
            if let Err(e) = check_relative(&entry.relative) {
                warn!("Skipping {}: {}", entry.item, e);
                self.failures.push(ItemFailure::new(&entry.item, &e));
                return;
            }
        }

        let mapped = map(&entry.relative);
        match entry.kind {
            ItemKind::Directory if target_is_local => self.directories.push(mapped),
            ItemKind::Directory => {}
            ItemKind::File => self.pairs.push(TransferPair {
                source: entry.item,
                target: mapped,
            }),
        }
    }
}

/// Result of the copy phase.
#[derive(Debug, Clone, Default)]
pub struct TransferOutcome {
    /// Successfully copied pairs, in batch order.
    pub copied: Vec<TransferPair>,
    pub failures: Vec<ItemFailure>,
}

impl TransferOutcome {
    pub fn source_items(&self) -> Vec<String> {
        self.copied.iter().map(|p| p.source.to_string()).collect()
    }

    pub fn target_items(&self) -> Vec<String> {
        self.copied.iter().map(|p| p.target.to_string()).collect()
    }

    pub fn files_processed(&self) -> usize {
        self.copied.len()
    }
}

/// Rejects locations no backend can serve.
pub(crate) fn check_location(location: &StorageLocation) -> StorageResult<()> {
    match location {
        StorageLocation::Object { container, .. } if container.is_empty() => Err(
            StorageError::InvalidLocation(format!("missing container in {}", location)),
        ),
        _ => Ok(()),
    }
}

/// Rejects relative paths with parent, root or prefix components.
fn check_relative(relative: &str) -> StorageResult<()> {
    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(StorageError::InvalidLocation(format!(
            "relative path '{}' leaves the location",
            relative
        )));
    }
    Ok(())
}

/// Nest `relative` under an explicit key that named a directory.
fn nest(item: &ItemRef, relative: &str) -> ItemRef {
    match item {
        ItemRef::Object { key, .. }
            if !relative.is_empty() && !key.is_empty() && !key.ends_with('/') =>
        {
            item.join(&format!("/{}", relative))
        }
        _ => item.join(relative),
    }
}

/// Copies items between two locations through the [`Storage`] router.
#[derive(Clone)]
pub struct TransferEngine {
    storage: Storage,
    max_concurrent_items: usize,
}

impl TransferEngine {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            max_concurrent_items: DEFAULT_MAX_CONCURRENT_ITEMS,
        }
    }

    /// Bound the number of items copied at once.
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    /// Resolve the (source, target) pairs for one run.
    ///
    /// With explicit keys each key is applied to both locations; a local key
    /// naming a directory is expanded recursively and a missing local key is
    /// recorded as a per-item failure. Without keys the whole source is
    /// enumerated and mapped onto the target by relative path. A listing
    /// failure during enumeration is fatal.
    pub async fn resolve_batch(
        &self,
        source: &StorageLocation,
        target: &StorageLocation,
        explicit_keys: &[String],
    ) -> StorageResult<TransferBatch> {
        check_location(source)?;
        check_location(target)?;

        let mut batch = TransferBatch::default();
        let target_is_local = !target.is_object();

        if !explicit_keys.is_empty() {
            for key in explicit_keys {
                let source_item = source.child(key);
                let target_item = target.child(key);

                if target_is_local || !source_item.is_object() {
                    if let Err(e) = check_relative(key) {
                        warn!("Skipping source key '{}': {}", key, e);
                        batch.failures.push(ItemFailure::new(&source_item, &e));
                        continue;
                    }
                }

                if source_item.is_object() {
                    batch.pairs.push(TransferPair {
                        source: source_item,
                        target: target_item,
                    });
                    continue;
                }

                let listed = match self
                    .storage
                    .backend_for(&source_item)
                    .list(&source_item.as_location())
                    .await
                {
                    Ok(listed) => listed,
                    Err(e) => {
                        warn!("Skipping source key '{}': {}", key, e);
                        batch.failures.push(ItemFailure::new(&source_item, &e));
                        continue;
                    }
                };

                // A file key lists as itself with an empty relative path.
                let names_directory =
                    !matches!(listed.as_slice(), [only] if only.relative.is_empty());
                if target_is_local && names_directory {
                    batch.directories.push(target_item.clone());
                }
                for entry in listed {
                    batch.push_listed(entry, target_is_local, |relative| {
                        nest(&target_item, relative)
                    });
                }
            }
        } else {
            let listed = self.storage.backend_for_location(source).list(source).await?;
            for entry in listed {
                batch.push_listed(entry, target_is_local, |relative| target.child(relative));
            }
        }

        debug!(
            "Resolved {} items and {} directories from {} to {}",
            batch.pairs.len(),
            batch.directories.len(),
            source,
            target
        );
        Ok(batch)
    }

    /// Copy everything under `source` (or the explicit keys) to `target`.
    ///
    /// Per-item failures are logged and collected; only a failure to resolve
    /// the batch is returned as an error.
    pub async fn transfer(
        &self,
        source: &StorageLocation,
        target: &StorageLocation,
        explicit_keys: &[String],
    ) -> StorageResult<TransferOutcome> {
        let batch = self.resolve_batch(source, target, explicit_keys).await?;

        for directory in &batch.directories {
            if let Err(e) = self
                .storage
                .backend_for(directory)
                .prepare_container(directory)
                .await
            {
                warn!("Failed to create directory {}: {}", directory, e);
            }
        }

        let storage = &self.storage;
        let results: Vec<_> = stream::iter(batch.pairs)
            .map(|pair| async move {
                let result = storage.copy(&pair.source, &pair.target).await;
                (pair, result)
            })
            .buffered(self.max_concurrent_items)
            .collect()
            .await;

        let mut outcome = TransferOutcome {
            copied: Vec::with_capacity(results.len()),
            failures: batch.failures,
        };
        for (pair, result) in results {
            match result {
                Ok(()) => {
                    info!("Copied {} to {}", pair.source, pair.target);
                    outcome.copied.push(pair);
                }
                Err(e) => {
                    warn!("Failed to copy {} to {}: {}", pair.source, pair.target, e);
                    outcome.failures.push(ItemFailure::new(&pair.source, &e));
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
