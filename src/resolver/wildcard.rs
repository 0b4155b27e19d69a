use crate::error::ResolveError;
use crate::key::WILDCARD_SEGMENT;
use crate::storage::Subtree;

use super::{Resolver, key_for};

/// The key which would hold wildcard values for a name with `labels`,
/// leftmost first.
///
/// The leftmost label is replaced by `*`, keeping the rest of the hierarchy,
/// so `baz.bar.disco.net.` maps to `/net/disco/bar/*` followed by `suffix`.
/// Returns `None` when there is no label to replace: for the root, for
/// single-label names, and for names whose leftmost label is already `*`.
pub(crate) fn wildcard_key(labels: &[String], suffix: &str) -> Option<String> {
    let (leftmost, parent) = labels.split_first()?;
    if leftmost == WILDCARD_SEGMENT || parent.is_empty() {
        return None;
    }

    Some(key_for(parent, &format!("/{WILDCARD_SEGMENT}{suffix}")))
}

impl Resolver {
    /// Retry a missed lookup against the wildcard entry one level up.
    ///
    /// Only a single level of substitution is attempted.
    #[tracing::instrument("wildcard", skip(self, labels), level = "trace")]
    pub(super) async fn wildcard(
        &self,
        labels: &[String],
        suffix: &str,
    ) -> Result<Option<Subtree>, ResolveError> {
        let Some(key) = wildcard_key(labels, suffix) else {
            tracing::trace!("no label to substitute");
            return Ok(None);
        };

        let found = self.fetch(&key).await?;
        if found.is_some() {
            tracing::debug!("matched wildcard {key}");
        }
        Ok(found)
    }
}
