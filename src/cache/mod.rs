//! Local durable cache for a cursor-paginated remote collection and its
//! per-item detail records.
//!
//! This module is domain-agnostic:
//! - Stores entities, per-entity page markers and per-query fetch times in SQLite
//! - Decides per page load whether the cache is fresh or the network is needed
//! - Commits network pages atomically, never partially
//! - Serves detail records cache-first with a background-style refresh

mod clock;
mod detail;
mod error;
mod freshness;
mod load_result;
mod mediator;
mod pager;
mod remote_keys;
mod storage;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use detail::DetailLoader;
pub use error::{CacheError, Result};
pub use load_result::LoadResult;
pub use mediator::{LoadType, MediatorResult, PagingConfig, PagingState, RemoteMediator};
pub use pager::Pager;
pub use storage::SqliteStorage;
pub use traits::{Cacheable, DetailSource, PageQuery, PageSource, QueryKey};
