//! Single-record lookups: cached value first, refreshed value second.

use async_stream::stream;
use chrono::Duration;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, warn};

use super::clock::Clock;
use super::freshness::is_expired;
use super::load_result::LoadResult;
use super::storage::SqliteStorage;
use super::traits::{Cacheable, DetailSource};

/// Loads one record by key, preferring the cache and refreshing it when it
/// is missing or older than the TTL.
pub struct DetailLoader<T> {
  storage: Arc<SqliteStorage>,
  source: Arc<dyn DetailSource<T>>,
  clock: Arc<dyn Clock>,
  ttl: Duration,
}

impl<T: Cacheable> DetailLoader<T> {
  pub fn new(
    storage: Arc<SqliteStorage>,
    source: Arc<dyn DetailSource<T>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
  ) -> Self {
    Self {
      storage,
      source,
      clock,
      ttl,
    }
  }

  /// Emits at most two results, in order:
  ///
  /// 1. `Success(cached)` if a record is cached, otherwise `Loading`
  /// 2. `Success(fetched)` if a fetch was needed and succeeded, or
  ///    `Error` if it failed and nothing cached was shown
  ///
  /// A failed refresh of a stale record emits nothing further. The stream
  /// is lazy: dropping it before the fetch resolves leaves the store as is.
  pub fn load(&self, key: &str) -> impl Stream<Item = LoadResult<T>> + Send + 'static {
    let storage = Arc::clone(&self.storage);
    let source = Arc::clone(&self.source);
    let clock = Arc::clone(&self.clock);
    let ttl = self.ttl;
    let key = key.to_string();

    stream! {
      let cached = match storage.get_entity::<T>(&key) {
        Ok(cached) => cached,
        Err(e) => {
          warn!(%key, error = %e, "failed to read cached record, treating as missing");
          None
        }
      };

      let needs_fetch = match &cached {
        Some(record) => {
          yield LoadResult::Success(record.entity.clone());
          is_expired(record.cached_at, clock.now(), ttl)
        }
        None => {
          yield LoadResult::Loading;
          true
        }
      };

      if needs_fetch {
        match source.fetch_detail(&key).await {
          Ok(fetched) => {
            if let Err(e) = storage.store_entity(&fetched, clock.now()) {
              warn!(%key, error = %e, "failed to cache fetched record");
            }
            yield LoadResult::Success(fetched);
          }
          Err(e) if cached.is_none() => {
            yield LoadResult::Error(format!("Failed to load {}: {}", key, e));
          }
          Err(e) => {
            debug!(%key, error = %e, "refresh failed, keeping stale record");
          }
        }
      }
    }
  }
}

impl<T> Clone for DetailLoader<T> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      source: Arc::clone(&self.source),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
    }
  }
}
