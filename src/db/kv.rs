//! Key-value persistence.
//!
//! Values are JSON documents addressed by `(area, key)`. The `sync` area holds
//! user data (settings, recent meetings, transcripts, saved links); the
//! `local` area holds machine-local scratch state such as the session recovery table.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Sync,
    Local,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Sync => "sync",
            Area::Local => "local",
        }
    }
}

/// Well-known keys.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const RECENT_MEETINGS: &str = "recentMeetings";
    pub const ACTIVE_SESSIONS: &str = "activeMeetingSessions";
    pub const RECENT_TRANSCRIPTS: &str = "recentTranscripts";
    pub const LINKS: &str = "links";
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>>;
    async fn set(&self, area: Area, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, area: Area, key: &str) -> Result<()>;
}

/// Reads `key` and decodes it, treating a missing key as `None`.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    area: Area,
    key: &str,
) -> Result<Option<T>> {
    match store.get(area, key).await? {
        Some(value) => {
            let decoded = serde_json::from_value(value)
                .with_context(|| format!("Failed to decode stored value for '{}'", key))?;
            Ok(Some(decoded))
        }
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize>(
    store: &dyn KvStore,
    area: Area,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_value(value)
        .with_context(|| format!("Failed to encode value for '{}'", key))?;
    store.set(area, key, encoded).await
}

/// SQLite-backed store; one row per `(area, key)`.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))?;
        f(&conn)
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE area = ?1 AND key = ?2",
                params![area.as_str(), key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read stored value")
        })?;

        raw.map(|text| serde_json::from_str(&text).context("Stored value is not valid JSON"))
            .transpose()
    }

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<()> {
        let text = serde_json::to_string(&value)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (area, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(area, key) DO UPDATE SET value = excluded.value,
                 updated_at = CURRENT_TIMESTAMP",
                params![area.as_str(), key, text],
            )
            .context("Failed to write stored value")?;
            Ok(())
        })
    }

    async fn remove(&self, area: Area, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv_store WHERE area = ?1 AND key = ?2",
                params![area.as_str(), key],
            )
            .context("Failed to remove stored value")?;
            Ok(())
        })
    }
}

/// In-process store. An optional latency is applied to every call, which
/// makes interleaving of concurrent read-modify-write cycles observable.
#[derive(Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<(Area, String), Value>>,
    latency: Option<Duration>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            values: Mutex::default(),
            latency: Some(latency),
        }
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(Area, String), Value>>> {
        self.values
            .lock()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, area: Area, key: &str) -> Result<Option<Value>> {
        self.pause().await;
        Ok(self.values()?.get(&(area, key.to_string())).cloned())
    }

    async fn set(&self, area: Area, key: &str, value: Value) -> Result<()> {
        self.pause().await;
        self.values()?.insert((area, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, area: Area, key: &str) -> Result<()> {
        self.pause().await;
        self.values()?.remove(&(area, key.to_string()));
        Ok(())
    }
}
