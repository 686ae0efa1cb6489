//! Storage locations and item references.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// URI prefix that marks a path as an object-store location.
pub const OBJECT_SCHEME: &str = "s3://";

/// Where a pipeline reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageLocation {
    /// A file or directory on the local filesystem.
    Local { path: PathBuf },
    /// A key prefix inside an object-store container (bucket).
    Object {
        container: String,
        key_prefix: String,
    },
}

impl StorageLocation {
    /// Classify a path string.
    ///
    /// Anything starting with `s3://` is an object location whose first path
    /// segment is the container; everything else is a local path.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(OBJECT_SCHEME) {
            Some(rest) => match rest.split_once('/') {
                Some((container, key_prefix)) => StorageLocation::Object {
                    container: container.to_string(),
                    key_prefix: key_prefix.to_string(),
                },
                None => StorageLocation::Object {
                    container: rest.to_string(),
                    key_prefix: String::new(),
                },
            },
            None => StorageLocation::Local {
                path: PathBuf::from(raw),
            },
        }
    }

    /// Whether the location lives in an object store.
    pub fn is_object(&self) -> bool {
        matches!(self, StorageLocation::Object { .. })
    }

    /// The location itself as a single item.
    pub fn as_item(&self) -> ItemRef {
        match self {
            StorageLocation::Local { path } => ItemRef::Local(path.clone()),
            StorageLocation::Object {
                container,
                key_prefix,
            } => ItemRef::Object {
                container: container.clone(),
                key: key_prefix.clone(),
            },
        }
    }

    /// The item addressed by `relative` under this location.
    pub fn child(&self, relative: &str) -> ItemRef {
        self.as_item().join(relative)
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Local { path } => write!(f, "{}", path.display()),
            StorageLocation::Object {
                container,
                key_prefix,
            } => write!(f, "{}{}/{}", OBJECT_SCHEME, container, key_prefix),
        }
    }
}

impl FromStr for StorageLocation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StorageLocation::parse(s))
    }
}

/// One concrete file or object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Local(PathBuf),
    Object { container: String, key: String },
}

impl ItemRef {
    /// Append a relative key.
    ///
    /// Local paths are joined component-wise. Object keys live in a flat
    /// namespace and are concatenated verbatim, so a prefix that should act
    /// as a folder must end with `/`.
    pub fn join(&self, relative: &str) -> ItemRef {
        match self {
            ItemRef::Local(path) => {
                let relative = relative.trim_start_matches('/');
                if relative.is_empty() {
                    ItemRef::Local(path.clone())
                } else {
                    ItemRef::Local(path.join(relative))
                }
            }
            ItemRef::Object { container, key } => ItemRef::Object {
                container: container.clone(),
                key: format!("{}{}", key, relative),
            },
        }
    }

    /// Treat the item as a location (for expanding a directory key).
    pub fn as_location(&self) -> StorageLocation {
        match self {
            ItemRef::Local(path) => StorageLocation::Local { path: path.clone() },
            ItemRef::Object { container, key } => StorageLocation::Object {
                container: container.clone(),
                key_prefix: key.clone(),
            },
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ItemRef::Object { .. })
    }

    /// Local path, if this is a filesystem item.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ItemRef::Local(path) => Some(path),
            ItemRef::Object { .. } => None,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Local(path) => write!(f, "{}", path.display()),
            ItemRef::Object { container, key } => {
                write!(f, "{}{}/{}", OBJECT_SCHEME, container, key)
            }
        }
    }
}
