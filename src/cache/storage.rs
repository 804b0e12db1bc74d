//! SQLite-backed local store with all-or-nothing transactions.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result as EyreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::error::{CacheError, Result};
use super::freshness::QueryTable;
use super::remote_keys::RemoteKeyTable;
use super::traits::Cacheable;

/// A single cached entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity<T> {
  /// The cached entity
  pub entity: T,
  /// When the entity was written
  pub cached_at: DateTime<Utc>,
}

/// SQLite-based cache storage.
///
/// The connection sits behind a mutex, so every transaction runs to
/// completion (commit or rollback) before another one can start.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> EyreResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))
  }

  /// Open a private in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  /// Get the default database path.
  pub fn default_path() -> EyreResult<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ghdir").join("cache.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| CacheError::LockPoisoned)
  }

  /// Run `body` inside one transaction.
  ///
  /// The transaction commits only if `body` returns `Ok`; on any error it is
  /// dropped and SQLite rolls every statement back.
  pub fn with_transaction<T, F>(&self, body: F) -> Result<T>
  where
    F: FnOnce(&Store<'_>) -> Result<T>,
  {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let value = body(&Store { conn: &tx })?;
    tx.commit()?;
    Ok(value)
  }

  /// Get a single entity by key.
  pub fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    self.with_transaction(|store| store.entities().get::<T>(entity_key))
  }

  /// Store a single entity, replacing any previous record with the same key.
  pub fn store_entity<T: Cacheable>(&self, entity: &T, cached_at: DateTime<Utc>) -> Result<()> {
    self.with_transaction(|store| store.entities().upsert(entity, cached_at))
  }

  /// Read up to `limit` entities starting at `offset`, in insertion order.
  pub fn read_page<T: Cacheable>(&self, offset: u64, limit: u32) -> Result<Vec<T>> {
    self.with_transaction(|store| store.entities().page::<T>(offset, limit))
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Generic entity cache (stores serialized JSON)
CREATE TABLE IF NOT EXISTS entity_cache (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL,
    PRIMARY KEY (entity_type, entity_key)
);

-- Page continuation markers, one per cached entity
CREATE TABLE IF NOT EXISTS remote_keys (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    prev_page INTEGER,
    next_page INTEGER,
    PRIMARY KEY (entity_type, entity_key)
);

-- Last successful fetch per logical query
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    query_description TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    fetched_at INTEGER NOT NULL,
    result_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_cache_type ON query_cache(entity_type);
"#;

/// Handle to the tables, valid for the duration of one transaction.
pub struct Store<'a> {
  conn: &'a Connection,
}

impl<'a> Store<'a> {
  pub fn entities(&self) -> EntityTable<'a> {
    EntityTable { conn: self.conn }
  }

  pub fn remote_keys(&self) -> RemoteKeyTable<'a> {
    RemoteKeyTable::new(self.conn)
  }

  pub fn queries(&self) -> QueryTable<'a> {
    QueryTable::new(self.conn)
  }
}

/// Cached entities, partitioned by `Cacheable::entity_type`.
pub struct EntityTable<'a> {
  conn: &'a Connection,
}

impl EntityTable<'_> {
  pub fn get<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let row: Option<(Vec<u8>, i64)> = self
      .conn
      .query_row(
        "SELECT data, cached_at FROM entity_cache
         WHERE entity_type = ? AND entity_key = ?",
        params![T::entity_type(), entity_key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((data, cached_at)) => Ok(Some(CachedEntity {
        entity: serde_json::from_slice(&data)?,
        cached_at: from_millis(cached_at),
      })),
      None => Ok(None),
    }
  }

  pub fn upsert<T: Cacheable>(&self, entity: &T, cached_at: DateTime<Utc>) -> Result<()> {
    let data = serde_json::to_vec(entity)?;

    self.conn.execute(
      "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, cached_at)
       VALUES (?, ?, ?, ?)",
      params![
        T::entity_type(),
        entity.cache_key(),
        data,
        cached_at.timestamp_millis()
      ],
    )?;

    Ok(())
  }

  pub fn upsert_all<T: Cacheable>(&self, entities: &[T], cached_at: DateTime<Utc>) -> Result<()> {
    for entity in entities {
      self.upsert(entity, cached_at)?;
    }
    Ok(())
  }

  /// Entities in insertion order; a replaced entity counts as newly inserted.
  pub fn page<T: Cacheable>(&self, offset: u64, limit: u32) -> Result<Vec<T>> {
    let mut stmt = self.conn.prepare(
      "SELECT data FROM entity_cache
       WHERE entity_type = ?
       ORDER BY rowid
       LIMIT ? OFFSET ?",
    )?;

    let rows = stmt
      .query_map(params![T::entity_type(), limit, offset as i64], |row| {
        row.get::<_, Vec<u8>>(0)
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    rows
      .iter()
      .map(|data| serde_json::from_slice(data).map_err(CacheError::from))
      .collect()
  }

  pub fn count<T: Cacheable>(&self) -> Result<u64> {
    let count: i64 = self.conn.query_row(
      "SELECT COUNT(*) FROM entity_cache WHERE entity_type = ?",
      params![T::entity_type()],
      |row| row.get(0),
    )?;
    Ok(count as u64)
  }

  /// Remove every entity of type `T`, returning how many were deleted.
  pub fn clear<T: Cacheable>(&self) -> Result<usize> {
    Ok(self.conn.execute(
      "DELETE FROM entity_cache WHERE entity_type = ?",
      params![T::entity_type()],
    )?)
  }
}

/// Unreadable timestamps decode as the earliest instant, i.e. always stale.
pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
