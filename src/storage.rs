//! Key-value storage for zone data
//!
//! The resolver reads zone data through the [`Storage`] trait, which returns
//! every node stored at or beneath a key. Any hierarchical store can back the
//! resolver by implementing it; this crate provides an in-memory store and a
//! SQLite-backed store.

use std::sync::Arc;

mod memory;
mod reader;
mod sqlite;

pub use self::memory::MemoryStore;
pub use self::reader::{Children, StorageReader, Subtree, Values};
pub use self::sqlite::{SqliteConfiguration, SqliteStore};

/// A single stored key and its value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node {
    key: String,
    value: String,
}

impl Node {
    /// Create a node. The key is normalized.
    pub fn new(key: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            key: crate::key::normalize_key(key.as_ref()),
            value: value.into(),
        }
    }

    /// The full key of this node
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Split the node into its key and value
    pub fn into_parts(self) -> (String, String) {
        (self.key, self.value)
    }
}

/// Errors returned by a storage backend.
///
/// Absence of data is reported as [`StorageError::NotFound`] so that callers
/// can tell it apart from a backend fault.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Nothing is stored at or beneath the key
    #[error("key not found: {0}")]
    NotFound(String),

    /// The store could not be read
    #[error("storage backend fault: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wrap a backend error
    pub fn backend<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StorageError::Backend(error.into())
    }

    /// Returns `true` if this error means the key is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        StorageError::backend(error)
    }
}

/// Read access to a hierarchical key-value store.
///
/// Implementations must be safe for concurrent reads, as queries are served
/// from many tasks at once.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Get all nodes at or beneath `prefix`.
    ///
    /// The prefix is a normalized key (see [`crate::key::normalize_key`]).
    /// Returned nodes carry their full keys. When nothing is stored at or
    /// beneath the prefix, implementations return [`StorageError::NotFound`].
    async fn get(&self, prefix: &str) -> Result<Vec<Node>, StorageError>;
}

#[async_trait::async_trait]
impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    async fn get(&self, prefix: &str) -> Result<Vec<Node>, StorageError> {
        (**self).get(prefix).await
    }
}

/// Returns `true` if `key` is `prefix` itself or lies beneath it.
///
/// Both keys must be normalized.
pub(crate) fn is_at_or_under(key: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(crate::key::SEPARATOR),
        None => false,
    }
}
