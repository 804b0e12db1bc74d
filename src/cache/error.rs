//! Error taxonomy for the caching layer.

use thiserror::Error;

/// Boxed cause carried by network failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the store, the mediator and the detail loader.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The remote service could not be reached or answered with a failure.
  #[error("network request failed: {0}")]
  Network(#[source] BoxError),

  /// A store statement or transaction failed; the transaction was rolled back.
  #[error("store transaction failed: {0}")]
  Store(#[from] rusqlite::Error),

  #[error("cache store lock poisoned")]
  LockPoisoned,

  /// Cached payload could not be (de)serialized.
  #[error("invalid cache data: {0}")]
  InvalidData(#[from] serde_json::Error),

  /// The key has neither a cached nor a remote record.
  #[error("no record found for {0}")]
  NotFound(String),
}

impl CacheError {
  /// Wrap any transport error (or plain message) as a network failure.
  pub fn network(cause: impl Into<BoxError>) -> Self {
    Self::Network(cause.into())
  }

  #[cfg(test)]
  pub fn is_network(&self) -> bool {
    matches!(self, Self::Network(_))
  }
}

pub type Result<T> = std::result::Result<T, CacheError>;
