//! Authoritative DNS answers served from a hierarchical key-value store.
//!
//! Zone data lives in a store of `(key, value)` nodes whose keys mirror the
//! DNS tree: the A records of `bar.disco.net.` are stored at
//! `/net/disco/bar/.A`, either as a single value or as an array of indexed
//! children (`/net/disco/bar/.A/0`, `/net/disco/bar/.A/1`, ...). A
//! [`Resolver`] answers questions by reading those values, synthesizing
//! records, and falling back to wildcard entries and zone SOA records.

pub mod error;
pub mod handler;
pub mod key;
pub mod resolver;
pub mod rr;
pub mod storage;

pub use self::error::ResolveError;
pub use self::handler::Handler;
pub use self::resolver::{Answer, Resolver, ResolverConfig};
pub use self::storage::{MemoryStore, SqliteConfiguration, SqliteStore, Storage, StorageError};
