//! # Ferry Storage
//!
//! Storage-agnostic item transfer for Ferry pipelines.
//!
//! A [`StorageLocation`] is either a local path or an object-store prefix.
//! Both are served through the [`StorageBackend`] capability trait, which the
//! [`TransferEngine`] and [`DeletionEngine`] use without knowing which kind of
//! storage sits behind a location.

mod backend;
mod deletion;
mod error;
mod location;
mod object_store;
mod transfer;

pub use backend::{ItemKind, ListedItem, LocalBackend, ObjectBackend, Storage, StorageBackend};
pub use deletion::{DeletionEngine, DeletionOutcome};
pub use error::{StorageError, StorageResult};
pub use location::{ItemRef, OBJECT_SCHEME, StorageLocation};
pub use object_store::{MemoryObjectStore, ObjectPage, ObjectStore, S3ObjectStore, S3Settings};
pub use transfer::{ItemFailure, TransferBatch, TransferEngine, TransferOutcome, TransferPair};

/// Default number of items copied or deleted concurrently within one run.
pub const DEFAULT_MAX_CONCURRENT_ITEMS: usize = 4;
