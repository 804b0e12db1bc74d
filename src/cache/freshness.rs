//! Freshness tracking for logical queries.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::error::Result;
use super::storage::{from_millis, Store};
use super::traits::QueryKey;

/// True once more than `ttl` has passed since `at`.
pub fn is_expired(at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
  now - at > ttl
}

/// Last successful fetch time per query.
pub struct QueryTable<'a> {
  conn: &'a Connection,
}

impl<'a> QueryTable<'a> {
  pub(crate) fn new(conn: &'a Connection) -> Self {
    Self { conn }
  }

  pub fn fetched_at<Q: QueryKey + ?Sized>(&self, query: &Q) -> Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = self
      .conn
      .query_row(
        "SELECT fetched_at FROM query_cache WHERE query_hash = ?",
        params![query.cache_hash()],
        |row| row.get(0),
      )
      .optional()?;

    Ok(millis.map(from_millis))
  }

  /// Upsert the fetch time. A stored time is never moved backwards.
  pub fn record<Q: QueryKey + ?Sized>(
    &self,
    query: &Q,
    entity_type: &str,
    fetched_at: DateTime<Utc>,
    result_count: usize,
  ) -> Result<()> {
    self.conn.execute(
      "INSERT INTO query_cache (query_hash, query_description, entity_type, fetched_at, result_count)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT(query_hash) DO UPDATE SET
         query_description = excluded.query_description,
         entity_type = excluded.entity_type,
         fetched_at = MAX(query_cache.fetched_at, excluded.fetched_at),
         result_count = excluded.result_count",
      params![
        query.cache_hash(),
        query.description(),
        entity_type,
        fetched_at.timestamp_millis(),
        result_count as i64
      ],
    )?;

    Ok(())
  }
}

/// Decides whether a cached query result is still within its validity window.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessTracker {
  ttl: Duration,
}

impl FreshnessTracker {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl }
  }

  /// Stale when the query was never fetched or its last fetch is older than the TTL.
  pub fn is_stale<Q: QueryKey + ?Sized>(
    &self,
    store: &Store<'_>,
    query: &Q,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    Ok(match store.queries().fetched_at(query)? {
      Some(fetched_at) => is_expired(fetched_at, now, self.ttl),
      None => true,
    })
  }

  pub fn record_fetch<Q: QueryKey + ?Sized>(
    &self,
    store: &Store<'_>,
    query: &Q,
    entity_type: &str,
    now: DateTime<Utc>,
    result_count: usize,
  ) -> Result<()> {
    store.queries().record(query, entity_type, now, result_count)
  }
}
