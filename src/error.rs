use crate::storage::StorageError;

/// Errors which abort the resolution of a query.
///
/// Missing data is not an error: the resolver falls back to wildcard and
/// authority lookups instead. Malformed stored values are skipped.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid query name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("reading zone data: {0}")]
    Backend(#[source] StorageError),
}

impl ResolveError {
    pub(crate) fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
