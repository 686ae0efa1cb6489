//! Local filesystem backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use super::{ItemKind, ListedItem, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::location::{ItemRef, StorageLocation};

/// Local filesystem backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

fn local_path<'a>(item: &'a ItemRef) -> StorageResult<&'a Path> {
    item.local_path().ok_or_else(|| {
        StorageError::InvalidLocation(format!("local backend cannot serve {}", item))
    })
}

/// `/`-separated path of `path` relative to `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Depth-first walk, parents before children, siblings by name.
fn walk(root: PathBuf) -> StorageResult<Vec<ListedItem>> {
    if !root.exists() {
        return Err(StorageError::NotFound(root.display().to_string()));
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|source| StorageError::Walk {
            path: root.clone(),
            source,
        })?;

        let kind = if entry.file_type().is_dir() {
            ItemKind::Directory
        } else {
            ItemKind::File
        };

        // The root directory is the location itself, not an item in it.
        if entry.depth() == 0 && kind == ItemKind::Directory {
            continue;
        }

        items.push(ListedItem {
            relative: relative_key(&root, entry.path()),
            item: ItemRef::Local(entry.path().to_path_buf()),
            kind,
        });
    }
    Ok(items)
}

/// Remove empty directories below `scope`, deepest first.
fn prune(scope: PathBuf, keep_scope: bool) -> usize {
    if !scope.is_dir() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(&scope).contents_first(true).into_iter().flatten() {
        if !entry.file_type().is_dir() || (keep_scope && entry.depth() == 0) {
            continue;
        }
        match std::fs::remove_dir(entry.path()) {
            Ok(()) => {
                debug!("Removed empty directory {}", entry.path().display());
                removed += 1;
            }
            Err(e) => {
                debug!("Keeping directory {}: {}", entry.path().display(), e);
            }
        }
    }
    removed
}

/// Whether both paths resolve to the same existing file.
async fn is_same_file(source: &Path, target: &Path) -> bool {
    match (fs::canonicalize(source).await, fs::canonicalize(target).await) {
        (Ok(source), Ok(target)) => source == target,
        _ => false,
    }
}

async fn ensure_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn list(&self, location: &StorageLocation) -> StorageResult<Vec<ListedItem>> {
        let root = match location {
            StorageLocation::Local { path } => path.clone(),
            other => {
                return Err(StorageError::InvalidLocation(format!(
                    "local backend cannot list {}",
                    other
                )));
            }
        };

        tokio::task::spawn_blocking(move || walk(root))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    async fn copy_item(&self, source: &ItemRef, target: &ItemRef) -> StorageResult<()> {
        let source = local_path(source)?;
        let target = local_path(target)?;

        // Copying a file onto itself would truncate it.
        if is_same_file(source, target).await {
            debug!("Skipping copy of {} onto itself", source.display());
            return Ok(());
        }

        ensure_parent(target).await?;
        fs::copy(source, target)
            .await
            .map_err(|e| StorageError::io(source, e))?;
        Ok(())
    }

    async fn delete_item(&self, item: &ItemRef) -> StorageResult<()> {
        let path = local_path(item)?;
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        if metadata.is_dir() {
            fs::remove_dir(path).await
        } else {
            fs::remove_file(path).await
        }
        .map_err(|e| StorageError::io(path, e))
    }

    async fn read_item(&self, item: &ItemRef) -> StorageResult<Vec<u8>> {
        let path = local_path(item)?;
        fs::read(path).await.map_err(|e| StorageError::io(path, e))
    }

    async fn write_item(&self, item: &ItemRef, body: Vec<u8>) -> StorageResult<()> {
        let path = local_path(item)?;
        ensure_parent(path).await?;
        fs::write(path, body)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn prepare_container(&self, item: &ItemRef) -> StorageResult<()> {
        let path = local_path(item)?;
        fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn prune_empty_containers(
        &self,
        scope: &ItemRef,
        keep_scope: bool,
    ) -> StorageResult<usize> {
        let scope = local_path(scope)?.to_path_buf();
        tokio::task::spawn_blocking(move || prune(scope, keep_scope))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
