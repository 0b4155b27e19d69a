//! Reading stored subtrees as ordered value sequences.
//!
//! A logical value may be stored as a scalar node or as an array of indexed
//! child nodes, which may themselves be arrays. [`Subtree`] rebuilds that
//! hierarchy from the flat node list returned by a [`Storage`] backend and
//! yields its leaf values depth-first, with integer index segments in
//! numeric order at every level.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use crate::key::{join_key, segments};

use super::{Node, Storage, StorageError, is_at_or_under};

/// Reads subtrees from a storage backend under a namespace prefix.
pub struct StorageReader<'s, S: ?Sized> {
    storage: &'s S,
    prefix: &'s str,
}

impl<S: ?Sized> fmt::Debug for StorageReader<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageReader")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl<'s, S> StorageReader<'s, S>
where
    S: Storage + ?Sized,
{
    /// Create a reader which resolves every key beneath `prefix`.
    pub fn new(storage: &'s S, prefix: &'s str) -> Self {
        Self { storage, prefix }
    }

    /// Fetch the subtree stored at `key`.
    ///
    /// Returns [`StorageError::NotFound`] when nothing is stored at or
    /// beneath the key.
    #[tracing::instrument("fetch", skip(self), fields(prefix = %self.prefix), level = "trace")]
    pub async fn fetch(&self, key: &str) -> Result<Subtree, StorageError> {
        let key = join_key(self.prefix, key);
        let nodes = self.storage.get(&key).await?;
        let tree = Subtree::from_nodes(&key, nodes);
        if tree.is_empty() {
            // The backend returned nodes, but none of them belong here.
            return Err(StorageError::NotFound(key));
        }
        Ok(tree)
    }
}

/// A key segment, ordered numerically when it is an array index.
///
/// Index segments sort before named segments. Two index segments with the
/// same numeric value (`1` and `01`) are ordered by their text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Index(u64, String),
    Named(String),
}

impl Segment {
    fn new(segment: &str) -> Self {
        match segment.parse::<u64>() {
            Ok(index) if segment.bytes().all(|b| b.is_ascii_digit()) => {
                Segment::Index(index, segment.to_owned())
            }
            _ => Segment::Named(segment.to_owned()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Segment::Index(_, text) | Segment::Named(text) => text,
        }
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Index(a, at), Segment::Index(b, bt)) => a.cmp(b).then_with(|| at.cmp(bt)),
            (Segment::Index(..), Segment::Named(_)) => Ordering::Less,
            (Segment::Named(_), Segment::Index(..)) => Ordering::Greater,
            (Segment::Named(a), Segment::Named(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A stored subtree, rooted at the key it was fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtree {
    value: Option<String>,
    children: BTreeMap<Segment, Subtree>,
}

impl Subtree {
    /// Build a subtree rooted at `root` from a list of nodes.
    ///
    /// Nodes which are not at or beneath `root` are ignored.
    pub fn from_nodes<I>(root: &str, nodes: I) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        let root = crate::key::normalize_key(root);
        let depth = segments(&root).count();

        let mut tree = Subtree::default();
        for node in nodes {
            if !is_at_or_under(node.key(), &root) {
                tracing::trace!(key = node.key(), "ignoring node outside {root}");
                continue;
            }

            let (key, value) = node.into_parts();
            let mut cursor = &mut tree;
            for segment in segments(&key).skip(depth) {
                cursor = cursor.children.entry(Segment::new(segment)).or_default();
            }
            cursor.value = Some(value);
        }
        tree
    }

    /// Returns `true` if no values are stored in this subtree.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.values().all(Subtree::is_empty)
    }

    /// The value stored directly at the root of this subtree, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Iterate over every value in this subtree, depth-first.
    ///
    /// A node's own value precedes its children. The iterator borrows the
    /// subtree, so it can be restarted by calling `values` again.
    pub fn values(&self) -> Values<'_> {
        Values {
            pending: self.value.as_deref(),
            stack: vec![self.children.values()],
        }
    }

    /// Iterate over the direct children of this subtree, in key order.
    pub fn children(&self) -> Children<'_> {
        Children {
            inner: self.children.iter(),
        }
    }

    /// Get a direct child by its key segment.
    pub fn child(&self, segment: &str) -> Option<&Subtree> {
        self.children.get(&Segment::new(segment))
    }
}

impl<'a> IntoIterator for &'a Subtree {
    type Item = &'a str;
    type IntoIter = Values<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.values()
    }
}

/// Depth-first iterator over the values of a [`Subtree`].
#[derive(Debug, Clone)]
pub struct Values<'a> {
    pending: Option<&'a str>,
    stack: Vec<btree_map::Values<'a, Segment, Subtree>>,
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.pending.take() {
                return Some(value);
            }

            let level = self.stack.last_mut()?;
            match level.next() {
                Some(child) => {
                    self.pending = child.value.as_deref();
                    self.stack.push(child.children.values());
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Iterator over the direct children of a [`Subtree`], as `(segment, subtree)`.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    inner: btree_map::Iter<'a, Segment, Subtree>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (&'a str, &'a Subtree);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(segment, subtree)| (segment.as_str(), subtree))
    }
}
