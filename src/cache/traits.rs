//! Core traits for the caching system and the remote capabilities it consumes.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::error::Result;

/// Trait for entities that can be cached.
///
/// Implementors provide a stable unique key; the store replaces any
/// previous record with the same key.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this entity (e.g., a user login)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "user", "user_detail")
  fn entity_type() -> &'static str;
}

/// A logical query whose result freshness is tracked.
pub trait QueryKey {
  /// Stable, fixed-length key used for persistence.
  fn cache_hash(&self) -> String;

  /// Human readable form, stored alongside the hash.
  fn description(&self) -> String;
}

/// A query key that identifies one page of a paginated collection.
pub trait PageQuery: QueryKey + Send + 'static {
  fn for_page(page: u32) -> Self;
}

/// Remote capability: fetch one page of a collection.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
  async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<T>>;
}

/// Remote capability: fetch a single record by key.
#[async_trait]
pub trait DetailSource<T>: Send + Sync {
  async fn fetch_detail(&self, key: &str) -> Result<T>;
}
