use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::key::normalize_key;

use super::{Node, Storage, StorageError, is_at_or_under};

/// A key-value store held in memory.
///
/// Useful for tests and for serving a fixed data set. Keys are normalized on
/// insertion.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value stored at `key`, returning the previous value.
    pub fn set(&self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = normalize_key(key.as_ref());
        tracing::trace!(%key, "set");
        self.nodes
            .write()
            .expect("store poisoned")
            .insert(key, value.into())
    }

    /// Remove `key` and everything beneath it, returning the number of nodes removed.
    pub fn remove(&self, key: impl AsRef<str>) -> usize {
        let key = normalize_key(key.as_ref());
        let mut nodes = self.nodes.write().expect("store poisoned");
        let before = nodes.len();
        nodes.retain(|k, _| !is_at_or_under(k, &key));
        before - nodes.len()
    }

    /// Number of nodes in the store
    pub fn len(&self) -> usize {
        self.nodes.read().expect("store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let store = MemoryStore::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStore {
    #[tracing::instrument("memory", skip(self), level = "trace")]
    async fn get(&self, prefix: &str) -> Result<Vec<Node>, StorageError> {
        let nodes = self.nodes.read().expect("store poisoned");

        // Keys beneath the prefix sort directly after it, so a range scan
        // from the prefix finds them all.
        let found: Vec<Node> = nodes
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .skip_while(|(key, _)| !is_at_or_under(key, prefix))
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| is_at_or_under(key, prefix))
            .map(|(key, value)| Node::new(key, value.clone()))
            .collect();

        if found.is_empty() {
            tracing::trace!("no nodes");
            return Err(StorageError::NotFound(prefix.to_owned()));
        }

        tracing::trace!("found {} nodes", found.len());
        Ok(found)
    }
}
