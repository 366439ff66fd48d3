//! Key/value persistence adapter
//!
//! The one place that touches the durable store. Everything above it works
//! against a namespaced text keyspace with JSON-serialized values, so the
//! backend could be swapped for any text-keyed store without changing the
//! contract. Here it is a single `kv` table in SQLite.
//!
//! Reads distinguish two failure shapes: a missing or unparseable value
//! yields the caller-supplied default, while a store-level fault (locked
//! file, disk error) propagates as [`Error::Store`].

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Namespace prefix applied to every key
pub const KEY_PREFIX: &str = "coretask_";

const INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// Owned handle on the durable store
pub struct KvStore {
    conn: Connection,
    prefix: String,
}

impl KvStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// An in-memory store, for tests and demos.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(INIT_SQL, [])?;
        Ok(Self {
            conn,
            prefix: KEY_PREFIX.to_string(),
        })
    }

    /// Read-only view outside any transaction.
    pub fn view(&self) -> KvView<'_> {
        KvView {
            conn: &self.conn,
            prefix: &self.prefix,
        }
    }

    /// Run `f` against the store inside a single transaction: committed when
    /// it returns `Ok`, rolled back entirely when it returns `Err`. Multi-key
    /// mutations go through here so a mid-sequence failure cannot leave keys
    /// mutually inconsistent.
    pub fn transaction<R>(&mut self, f: impl FnOnce(&KvView<'_>) -> Result<R>) -> Result<R> {
        let tx = self.conn.transaction()?;
        let out = f(&KvView {
            conn: &*tx,
            prefix: &self.prefix,
        })?;
        tx.commit()?;
        Ok(out)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.view().get(key)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        self.view().get_or(key, default)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.view().set(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.view().remove(key)
    }
}

/// Borrowed view of the store; identical surface inside and outside a
/// transaction.
pub struct KvView<'a> {
    conn: &'a Connection,
    prefix: &'a str,
}

impl KvView<'_> {
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Fetch and parse a value. Missing key or corrupt payload yields `None`;
    /// only store faults are errors.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                [self.full_key(key)],
                |row| row.get(0),
            )
            .optional()?;

        let Some(text) = text else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, %err, "discarding corrupt value");
                Ok(None)
            }
        }
    }

    /// Like [`get`](Self::get) but substituting `default` for an absent or
    /// corrupt value.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [self.full_key(key), text],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", [self.full_key(key)])?;
        Ok(())
    }

    /// Delete every key under the namespace prefix.
    pub fn clear(&self) -> Result<()> {
        // GLOB rather than LIKE: the prefix contains an underscore, which
        // LIKE would treat as a wildcard.
        self.conn.execute(
            "DELETE FROM kv WHERE key GLOB ?1",
            [format!("{}*", self.prefix)],
        )?;
        Ok(())
    }

    /// All logical (prefix-stripped) keys currently present.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv WHERE key GLOB ?1")?;
        let rows = stmt.query_map([format!("{}*", self.prefix)], |row| {
            row.get::<_, String>(0)
        })?;
        let mut keys = Vec::new();
        for row in rows {
            let key = row?;
            keys.push(key[self.prefix.len()..].to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_round_trip() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("answer", &42u32).unwrap();
        assert_eq!(kv.get::<u32>("answer").unwrap(), Some(42));
    }

    #[test]
    fn missing_key_yields_default() {
        let kv = KvStore::in_memory().unwrap();
        let got: Vec<String> = kv.get_or("nope", Vec::new()).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn corrupt_value_yields_default() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("blob", &json!({"a": 1})).unwrap();
        // A map does not parse as a number; caller gets the default.
        assert_eq!(kv.get_or::<u64>("blob", 7).unwrap(), 7);
    }

    #[test]
    fn remove_deletes_key() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("gone", &"soon").unwrap();
        kv.remove("gone").unwrap();
        assert_eq!(kv.get::<String>("gone").unwrap(), None);
    }

    #[test]
    fn clear_removes_only_namespaced_keys() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("a", &1).unwrap();
        kv.set("b", &2).unwrap();
        kv.view().clear().unwrap();
        assert_eq!(kv.get::<i32>("a").unwrap(), None);
        assert_eq!(kv.get::<i32>("b").unwrap(), None);
    }

    #[test]
    fn keys_are_prefix_stripped() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("users", &Vec::<u8>::new()).unwrap();
        kv.set("version", &"1.0.0").unwrap();
        let mut keys = kv.view().keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["users", "version"]);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut kv = KvStore::in_memory().unwrap();
        kv.set("kept", &"before").unwrap();
        let result: Result<()> = kv.transaction(|tx| {
            tx.set("kept", &"after")?;
            Err(crate::Error::InvalidInput("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(kv.get::<String>("kept").unwrap().as_deref(), Some("before"));
    }
}
