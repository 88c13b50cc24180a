//! Durable key-value storage backing the weather cache.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt value for key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value persistence with atomic multi-key writes.
///
/// Readers never observe a partially applied `set_many` or `remove_many`.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StoreError>;

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), StoreError>;
}

/// SQLite-backed store. One table, values kept as JSON text.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for (key, value) in entries {
            let text = serde_json::to_string(value).map_err(|source| StoreError::Encode {
                key: key.to_string(),
                source,
            })?;
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, text],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_many(&mut self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sqlite_set_get_remove() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("location").unwrap(), None);

        store
            .set_many(&[("location", json!("London")), ("lastUpdate", json!(42))])
            .unwrap();
        assert_eq!(store.get("location").unwrap(), Some(json!("London")));
        assert_eq!(store.get("lastUpdate").unwrap(), Some(json!(42)));

        store.remove_many(&["location", "lastUpdate"]).unwrap();
        assert_eq!(store.get("location").unwrap(), None);
        assert_eq!(store.get("lastUpdate").unwrap(), None);
    }

    #[test]
    fn test_sqlite_overwrites_existing_key() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.set_many(&[("location", json!("London"))]).unwrap();
        store.set_many(&[("location", json!("Paris"))]).unwrap();
        assert_eq!(store.get("location").unwrap(), Some(json!("Paris")));
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set_many(&[("location", json!("Oslo"))]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("location").unwrap(), Some(json!("Oslo")));
    }

    #[test]
    fn test_sqlite_reports_corrupt_value() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO kv (key, value) VALUES ('weatherData', '{not json')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.get("weatherData"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.set_many(&[("a", json!(1)), ("b", json!(2))]).unwrap();
        store.remove_many(&["a"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(json!(2)));
    }
}
