use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use monarch_db::{MonarchDB, StaticMonarchConfiguration};
use rusqlite::{Connection, named_params};
use serde::Deserialize;

use crate::key::{SEPARATOR, normalize_key};

use super::{Node, Storage, StorageError};

const MONARCH: StaticMonarchConfiguration<1> = StaticMonarchConfiguration {
    name: "hazel",
    enable_foreign_keys: false,
    migrations: [include_str!("migrations/01.node.sql")],
};

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqliteConfiguration {
    #[serde(default)]
    path: Option<Utf8PathBuf>,
}

impl SqliteConfiguration {
    /// Use a database file at `path`.
    pub fn with_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Path to the database file. `None` means an in-memory database.
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        self.path.as_ref()
    }
}

/// A key-value store persisted in SQLite.
///
/// Each node is one row keyed by its normalized key, so reading a subtree
/// is a single range scan.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn prepare(connection: Connection) -> rusqlite::Result<Self> {
        let db = MonarchDB::from(MONARCH);
        let connection = db.migrate(connection)?;
        Ok(Self::new(connection))
    }

    /// Open the store described by a configuration.
    pub fn new_from_config(config: &SqliteConfiguration) -> rusqlite::Result<Self> {
        let connection = if let Some(path) = &config.path {
            rusqlite::Connection::open(path)?
        } else {
            rusqlite::Connection::open_in_memory()?
        };

        Self::prepare(connection)
    }

    /// Open a store backed by an in-memory database.
    pub fn new_in_memory() -> rusqlite::Result<Self> {
        let connection = rusqlite::Connection::open_in_memory()?;
        Self::prepare(connection)
    }

    /// Set the value stored at `key`.
    #[tracing::instrument(skip(self, value), level = "debug")]
    pub fn set(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        let conn = self.connection.lock().expect("connection poisoned");
        let n = conn.execute(
            "INSERT INTO node (key, value) VALUES (:key, :value) ON CONFLICT (key) DO UPDATE SET value=excluded.value",
            named_params! { ":key": normalize_key(key), ":value": value },
        )?;
        tracing::trace!("upsert {n} nodes");
        Ok(())
    }

    /// Remove `key` and everything beneath it, returning the number of nodes removed.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn remove(&self, key: &str) -> rusqlite::Result<usize> {
        let key = normalize_key(key);
        let conn = self.connection.lock().expect("connection poisoned");
        let n = if key == "/" {
            conn.execute("DELETE FROM node", [])?
        } else {
            let (lower, upper) = child_range(&key);
            conn.execute(
                "DELETE FROM node WHERE key = :key OR (key >= :lower AND key < :upper)",
                named_params! { ":key": key, ":lower": lower, ":upper": upper },
            )?
        };
        tracing::debug!("delete {n} nodes");
        Ok(n)
    }

    fn select(&self, prefix: &str) -> rusqlite::Result<Vec<Node>> {
        let conn = self.connection.lock().expect("connection poisoned");
        let row = |row: &rusqlite::Row| -> rusqlite::Result<Node> {
            Ok(Node::new(
                row.get::<_, String>("key")?,
                row.get::<_, String>("value")?,
            ))
        };

        if prefix == "/" {
            let mut stmt = conn.prepare("SELECT key, value FROM node ORDER BY key")?;
            let nodes: rusqlite::Result<Vec<Node>> = stmt.query_map([], row)?.collect();
            return nodes;
        }

        let (lower, upper) = child_range(prefix);
        let mut stmt = conn.prepare(
            "SELECT key, value FROM node WHERE key = :key OR (key >= :lower AND key < :upper) ORDER BY key",
        )?;
        let nodes: rusqlite::Result<Vec<Node>> = stmt
            .query_map(
                named_params! { ":key": prefix, ":lower": lower, ":upper": upper },
                row,
            )?
            .collect();
        nodes
    }
}

/// The half-open key range holding every key beneath `key`.
///
/// Children of `/a` are the keys starting with `/a/`; the next character
/// after `/` is `0`, so they all sort below `/a0`.
fn child_range(key: &str) -> (String, String) {
    let lower = format!("{key}{SEPARATOR}");
    let upper = format!("{key}{}", char::from(SEPARATOR as u8 + 1));
    (lower, upper)
}

#[async_trait::async_trait]
impl Storage for SqliteStore {
    #[tracing::instrument("sqlite", skip(self), level = "trace")]
    async fn get(&self, prefix: &str) -> Result<Vec<Node>, StorageError> {
        let nodes = self.select(prefix)?;
        if nodes.is_empty() {
            return Err(StorageError::NotFound(prefix.to_owned()));
        }
        tracing::trace!("found {} nodes", nodes.len());
        Ok(nodes)
    }
}
