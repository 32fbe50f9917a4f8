use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::error::{KalimaError, Result};
use crate::profile::UserId;

/// The kinds of record the game persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum RecordKind {
    #[strum(serialize = "gameState")]
    GameState,
    #[strum(serialize = "evaluations")]
    Evaluations,
    #[strum(serialize = "statistics")]
    Statistics,
    #[strum(serialize = "userProfile")]
    UserProfile,
    #[strum(serialize = "validWordsCache")]
    ValidWordsCache,
    #[strum(serialize = "hasPlayedBefore")]
    HasPlayedBefore,
}

/// Address of one record: a kind, optionally scoped to a user.
///
/// Renders as `gameState` for the unscoped slot and `gameState_<userId>` for
/// a user's own slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub kind: RecordKind,
    pub user: Option<UserId>,
}

impl StorageKey {
    pub fn global(kind: RecordKind) -> Self {
        Self { kind, user: None }
    }

    pub fn for_user(kind: RecordKind, user: &UserId) -> Self {
        Self {
            kind,
            user: Some(user.clone()),
        }
    }

    /// User slot when a user is known, else the unscoped slot.
    pub fn scoped(kind: RecordKind, user: Option<&UserId>) -> Self {
        Self {
            kind,
            user: user.cloned(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}_{}", self.kind, user),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Opaque string key/value persistence.
pub trait KvStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>>;
    fn set(&mut self, key: &StorageKey, value: &str) -> Result<()>;
    fn remove(&mut self, key: &StorageKey) -> Result<()>;

    /// Write several records; backends that can should make this all-or-nothing.
    fn set_many(&mut self, entries: &[(StorageKey, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Read and decode a record. Missing, unreadable and malformed records all
/// come back as `None`.
pub fn load_record<T: DeserializeOwned>(store: &dyn KvStore, key: &StorageKey) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key = %key, error = %err, "failed to read record");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(source) => {
            let err = KalimaError::MalformedRecord {
                key: key.to_string(),
                source,
            };
            warn!(error = %err, "discarding malformed record");
            None
        }
    }
}

pub fn encode_record<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn save_record<T: Serialize>(store: &mut dyn KvStore, key: &StorageKey, value: &T) -> Result<()> {
    store.set(key, &encode_record(value)?)
}

/// SQLite-backed store; one row per key.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| KalimaError::StateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(SqliteStore { conn })
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM records ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}

const UPSERT: &str = r#"
    INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#;

impl KvStore for SqliteStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                [key.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &StorageKey, value: &str) -> Result<()> {
        self.conn.execute(
            UPSERT,
            params![key.to_string(), value, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &StorageKey) -> Result<()> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?1", [key.to_string()])?;
        Ok(())
    }

    fn set_many(&mut self, entries: &[(StorageKey, String)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        let now = Local::now().to_rfc3339();
        for (key, value) in entries {
            tx.execute(UPSERT, params![key.to_string(), value, now])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        Ok(self.records.get(&key.to_string()).cloned())
    }

    fn set(&mut self, key: &StorageKey, value: &str) -> Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &StorageKey) -> Result<()> {
        self.records.remove(&key.to_string());
        Ok(())
    }
}
