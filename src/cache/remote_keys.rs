//! Per-entity pagination markers used to resume forward paging.

use rusqlite::{params, Connection, OptionalExtension};

use super::error::Result;
use super::traits::Cacheable;

/// Page markers recorded for one entity, as of the page it was last fetched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKey {
  pub entity_key: String,
  pub prev_page: Option<u32>,
  /// `None` once the end of pagination has been reached
  pub next_page: Option<u32>,
}

impl RemoteKey {
  pub fn new(entity_key: impl Into<String>, prev_page: Option<u32>, next_page: Option<u32>) -> Self {
    Self {
      entity_key: entity_key.into(),
      prev_page,
      next_page,
    }
  }
}

/// Remote keys, partitioned by the entity type they belong to.
pub struct RemoteKeyTable<'a> {
  conn: &'a Connection,
}

impl<'a> RemoteKeyTable<'a> {
  pub(crate) fn new(conn: &'a Connection) -> Self {
    Self { conn }
  }

  pub fn get<T: Cacheable>(&self, entity_key: &str) -> Result<Option<RemoteKey>> {
    let key = self
      .conn
      .query_row(
        "SELECT entity_key, prev_page, next_page FROM remote_keys
         WHERE entity_type = ? AND entity_key = ?",
        params![T::entity_type(), entity_key],
        |row| {
          Ok(RemoteKey {
            entity_key: row.get(0)?,
            prev_page: row.get(1)?,
            next_page: row.get(2)?,
          })
        },
      )
      .optional()?;

    Ok(key)
  }

  /// Batch upsert; an existing key for the same entity is replaced.
  pub fn save<T: Cacheable>(&self, keys: &[RemoteKey]) -> Result<()> {
    let mut stmt = self.conn.prepare(
      "INSERT OR REPLACE INTO remote_keys (entity_type, entity_key, prev_page, next_page)
       VALUES (?, ?, ?, ?)",
    )?;

    for key in keys {
      stmt.execute(params![
        T::entity_type(),
        key.entity_key,
        key.prev_page,
        key.next_page
      ])?;
    }

    Ok(())
  }

  pub fn clear<T: Cacheable>(&self) -> Result<usize> {
    Ok(self.conn.execute(
      "DELETE FROM remote_keys WHERE entity_type = ?",
      params![T::entity_type()],
    )?)
  }
}
