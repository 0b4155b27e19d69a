//! Answering DNS questions from the key-value store
//!
//! A query passes through a short sequence of steps:
//!
//! 1. Determine which record types to look up. A query for `ANY` looks up
//!    every type marker stored directly under the name; any other query looks
//!    up just the requested type.
//! 2. Fetch the values for each type at the exact name, falling back to a
//!    wildcard entry one level up when the exact name has none.
//! 3. Synthesize records from the values, in stored order.
//! 4. If no records were produced, walk up the name to find the closest
//!    enclosing SOA record and return it in the authority section.

use std::fmt;
use std::sync::Arc;

use hickory_proto::op::Query;
use hickory_proto::rr::{Name, Record, RecordType};
use serde::Deserialize;

use crate::error::ResolveError;
use crate::key::labels_to_key;
use crate::rr::{RecordKind, TimeToLive};
use crate::storage::{Storage, StorageError, StorageReader, Subtree};

mod authority;
mod wildcard;

/// Configuration for a [`Resolver`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    /// Key prefix applied to every lookup, isolating one namespace of the store.
    #[serde(default)]
    prefix: String,

    /// Time to live of synthesized records.
    #[serde(default)]
    ttl: TimeToLive,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all keys beneath `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Serve records with the given TTL.
    pub fn with_ttl(mut self, ttl: impl Into<TimeToLive>) -> Self {
        self.ttl = ttl.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> TimeToLive {
        self.ttl
    }
}

/// The records produced for a query.
///
/// Either the answer section or the authority section is populated, never
/// both. Both are empty when the name has no data and no enclosing SOA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    answers: Vec<Record>,
    authority: Vec<Record>,
}

impl Answer {
    /// Records answering the question
    pub fn answers(&self) -> &[Record] {
        &self.answers
    }

    /// The enclosing SOA, when there are no answers
    pub fn authority(&self) -> &[Record] {
        &self.authority
    }

    /// Returns `true` if both sections are empty.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.authority.is_empty()
    }

    /// Split into the answer and authority sections
    pub fn into_parts(self) -> (Vec<Record>, Vec<Record>) {
        (self.answers, self.authority)
    }
}

/// Resolves DNS questions against a key-value store.
///
/// The resolver holds no state besides its configuration and a shared handle
/// to the store, so it is cheap to clone and can serve queries concurrently.
#[derive(Clone)]
pub struct Resolver {
    storage: Arc<dyn Storage>,
    config: ResolverConfig,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .finish()
    }
}

impl Resolver {
    /// Create a resolver reading from `storage`.
    pub fn new<S>(storage: S, config: ResolverConfig) -> Self
    where
        S: Storage + 'static,
    {
        Self::from_shared(Arc::new(storage), config)
    }

    /// Create a resolver reading from a shared store.
    pub fn from_shared(storage: Arc<dyn Storage>, config: ResolverConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Answer a DNS question.
    pub async fn lookup(&self, query: &Query) -> Result<Answer, ResolveError> {
        self.resolve(query.name(), query.query_type()).await
    }

    /// Answer a question for a textual name.
    ///
    /// Relative names are treated as fully qualified.
    pub async fn resolve_str(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Answer, ResolveError> {
        if name.trim().is_empty() {
            return Err(ResolveError::invalid_name(name, "empty name"));
        }

        let mut parsed = Name::from_utf8(name)
            .map_err(|error| ResolveError::invalid_name(name, error.to_string()))?;
        parsed.set_fqdn(true);
        self.resolve(&parsed, record_type).await
    }

    /// Answer a question for `name` and `record_type`.
    #[tracing::instrument(skip(self), fields(%name, query = %record_type), level = "debug")]
    pub async fn resolve(
        &self,
        name: &Name,
        record_type: RecordType,
    ) -> Result<Answer, ResolveError> {
        let labels = key_labels(name)?;
        let found = self.determine(&labels, record_type).await?;

        let mut answer = Answer::default();
        for (kind, values) in &found {
            for value in values.values() {
                match kind.synthesize(name, value, self.config.ttl) {
                    Ok(record) => answer.answers.push(record),
                    Err(error) => tracing::warn!("skipping record: {error}"),
                }
            }
        }

        if answer.answers.is_empty() {
            tracing::trace!("no answers, looking for authority");
            answer.authority.extend(self.find_authority(name, &labels).await?);
        }

        tracing::debug!(
            answers = answer.answers.len(),
            authority = answer.authority.len(),
            "resolved"
        );
        Ok(answer)
    }

    /// Returns `true` if anything is stored at or beneath `name`, or at a
    /// wildcard entry which would match it.
    pub async fn name_exists(&self, name: &Name) -> Result<bool, ResolveError> {
        let labels = key_labels(name)?;
        if self.fetch(&key_for(&labels, "")).await?.is_some() {
            return Ok(true);
        }
        Ok(self.wildcard(&labels, "").await?.is_some())
    }

    /// Find the stored values for each record type the question asks for.
    async fn determine(
        &self,
        labels: &[String],
        record_type: RecordType,
    ) -> Result<Vec<(RecordKind, Subtree)>, ResolveError> {
        if record_type == RecordType::ANY {
            let tree = match self.fetch(&key_for(labels, "")).await? {
                Some(tree) => Some(tree),
                None => self.wildcard(labels, "").await?,
            };
            let Some(tree) = tree else {
                return Ok(Vec::new());
            };

            let mut found: Vec<_> = tree
                .children()
                .filter(|(segment, _)| segment.starts_with('.'))
                .filter_map(|(segment, values)| match RecordKind::from_marker(segment) {
                    Some(kind) => Some((kind, values.clone())),
                    None => {
                        tracing::debug!("ignoring unsupported type marker {segment}");
                        None
                    }
                })
                .collect();

            // Stable, so values for markers which differ only by case keep key order.
            found.sort_by_key(|(kind, _)| *kind);
            tracing::trace!("ANY expands to {} types", found.len());
            return Ok(found);
        }

        let Some(kind) = RecordKind::from_record_type(record_type) else {
            tracing::debug!("no stored representation for {record_type}");
            return Ok(Vec::new());
        };

        let suffix = kind.key_suffix();
        let tree = match self.fetch(&key_for(labels, &suffix)).await? {
            Some(tree) => Some(tree),
            None => {
                tracing::trace!("no direct record found");
                self.wildcard(labels, &suffix).await?
            }
        };

        Ok(tree.into_iter().map(|tree| (kind, tree)).collect())
    }

    /// Fetch a subtree, treating absence as `None`.
    async fn fetch(&self, key: &str) -> Result<Option<Subtree>, ResolveError> {
        let reader = StorageReader::new(&*self.storage, &self.config.prefix);
        match reader.fetch(key).await {
            Ok(tree) => Ok(Some(tree)),
            Err(StorageError::NotFound(key)) => {
                tracing::trace!("{key} not found");
                Ok(None)
            }
            Err(error) => Err(ResolveError::Backend(error)),
        }
    }
}

/// The case-folded labels of `name`, leftmost first, used to build storage keys.
///
/// Keys hold label bytes as they are, so labels must be UTF-8 and must not
/// contain a key separator. An escaped `.` inside a label is rejected too,
/// since it could not be told apart from a label boundary in a stored key.
fn key_labels(name: &Name) -> Result<Vec<String>, ResolveError> {
    name.iter()
        .map(|label| {
            let label = std::str::from_utf8(label).map_err(|_| {
                ResolveError::invalid_name(name.to_string(), "label is not valid UTF-8")
            })?;
            if label.contains(['/', '.']) {
                return Err(ResolveError::invalid_name(
                    name.to_string(),
                    "label contains a key separator",
                ));
            }
            Ok(label.to_ascii_lowercase())
        })
        .collect()
}

/// The key for `labels`, leftmost first, followed by `suffix`.
fn key_for(labels: &[String], suffix: &str) -> String {
    labels_to_key(labels.iter().map(String::as_str), suffix)
}
