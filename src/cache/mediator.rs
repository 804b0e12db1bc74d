//! Remote mediator: decides per page load whether to trust the cache or call
//! the network, and commits network pages into the store atomically.

use chrono::Duration;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::error::{CacheError, Result};
use super::freshness::FreshnessTracker;
use super::remote_keys::RemoteKey;
use super::storage::SqliteStorage;
use super::traits::{Cacheable, PageQuery, PageSource};

/// Pagination intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
  /// Restart from the starting page
  Refresh,
  /// Continue forward from the last loaded item
  Append,
  /// Continue backward; never supported, always reports the end
  Prepend,
}

/// Whether the initial refresh needs to hit the network at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
  LaunchInitialRefresh,
  SkipInitialRefresh,
}

/// Outcome of a single page load.
#[derive(Debug)]
pub enum MediatorResult {
  Success { end_of_pagination_reached: bool },
  Error(CacheError),
}

impl MediatorResult {
  /// `Ok(end_of_pagination_reached)` or the failure.
  pub fn into_result(self) -> Result<bool> {
    match self {
      MediatorResult::Success {
        end_of_pagination_reached,
      } => Ok(end_of_pagination_reached),
      MediatorResult::Error(e) => Err(e),
    }
  }
}

#[cfg(test)]
impl MediatorResult {
  pub fn is_success(&self) -> bool {
    matches!(self, MediatorResult::Success { .. })
  }

  pub fn end_of_pagination_reached(&self) -> bool {
    matches!(
      self,
      MediatorResult::Success {
        end_of_pagination_reached: true
      }
    )
  }
}

/// Paging parameters, injected so tests can pick their own.
#[derive(Debug, Clone, Copy)]
pub struct PagingConfig {
  pub page_size: u32,
  pub starting_page: u32,
  /// How long a fetched page counts as fresh
  pub ttl: Duration,
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self {
      page_size: 20,
      starting_page: 1,
      ttl: Duration::minutes(5),
    }
  }
}

/// The pages a reader currently holds in memory.
#[derive(Debug, Clone)]
pub struct PagingState<T> {
  pub pages: Vec<Vec<T>>,
}

impl<T> Default for PagingState<T> {
  fn default() -> Self {
    Self { pages: Vec::new() }
  }
}

impl<T> PagingState<T> {
  /// Last item of the last page that has any items.
  pub fn last_item(&self) -> Option<&T> {
    self
      .pages
      .iter()
      .rev()
      .find(|page| !page.is_empty())
      .and_then(|page| page.last())
  }

  pub fn item_count(&self) -> usize {
    self.pages.iter().map(Vec::len).sum()
  }
}

/// Coordinates page loads between the store and a remote page source.
pub struct RemoteMediator<T, Q> {
  storage: Arc<SqliteStorage>,
  source: Arc<dyn PageSource<T>>,
  clock: Arc<dyn Clock>,
  config: PagingConfig,
  freshness: FreshnessTracker,
  _query: PhantomData<fn() -> Q>,
}

impl<T: Cacheable, Q: PageQuery> RemoteMediator<T, Q> {
  pub fn new(
    storage: Arc<SqliteStorage>,
    source: Arc<dyn PageSource<T>>,
    clock: Arc<dyn Clock>,
    config: PagingConfig,
  ) -> Self {
    Self {
      storage,
      source,
      clock,
      config,
      freshness: FreshnessTracker::new(config.ttl),
      _query: PhantomData,
    }
  }

  pub fn config(&self) -> &PagingConfig {
    &self.config
  }

  pub fn storage(&self) -> &Arc<SqliteStorage> {
    &self.storage
  }

  /// Skip the initial refresh when the starting page is still fresh.
  pub fn initialize(&self) -> Result<InitializeAction> {
    if self.should_fetch(self.config.starting_page)? {
      Ok(InitializeAction::LaunchInitialRefresh)
    } else {
      Ok(InitializeAction::SkipInitialRefresh)
    }
  }

  /// Load one page for `load_type`. Failures come back as
  /// `MediatorResult::Error`; nothing in the store changes on failure.
  pub async fn load(&self, load_type: LoadType, state: &PagingState<T>) -> MediatorResult {
    match self.try_load(load_type, state).await {
      Ok(end_of_pagination_reached) => MediatorResult::Success {
        end_of_pagination_reached,
      },
      Err(e) => {
        warn!(?load_type, error = %e, "page load failed");
        MediatorResult::Error(e)
      }
    }
  }

  async fn try_load(&self, load_type: LoadType, state: &PagingState<T>) -> Result<bool> {
    let page = match load_type {
      LoadType::Refresh => self.config.starting_page,
      LoadType::Prepend => return Ok(true),
      LoadType::Append => match self.remote_key_for_last_item(state)?.and_then(|k| k.next_page) {
        Some(next_page) => next_page,
        None => {
          debug!("no continuation page recorded, end of pagination");
          return Ok(true);
        }
      },
    };

    if !self.should_fetch(page)? {
      debug!(page, "page still fresh, serving from cache");
      return Ok(false);
    }

    let query = Q::for_page(page);
    let offset = u64::from(page) * u64::from(self.config.page_size);
    let items = self.source.fetch_page(offset, self.config.page_size).await?;

    let end_of_pagination_reached = items.is_empty();
    let prev_page = if page == self.config.starting_page {
      None
    } else {
      page.checked_sub(1)
    };
    let next_page = if end_of_pagination_reached {
      None
    } else {
      Some(page + 1)
    };
    let now = self.clock.now();

    self.storage.with_transaction(|store| {
      if load_type == LoadType::Refresh {
        store.entities().clear::<T>()?;
        store.remote_keys().clear::<T>()?;
      }

      let keys: Vec<RemoteKey> = items
        .iter()
        .map(|item| RemoteKey::new(item.cache_key(), prev_page, next_page))
        .collect();
      store.remote_keys().save::<T>(&keys)?;
      store.entities().upsert_all(&items, now)?;
      self
        .freshness
        .record_fetch(store, &query, T::entity_type(), now, items.len())
    })?;

    info!(
      page,
      count = items.len(),
      query = %query.description(),
      "committed page"
    );

    Ok(end_of_pagination_reached)
  }

  fn should_fetch(&self, page: u32) -> Result<bool> {
    let query = Q::for_page(page);
    let now = self.clock.now();
    self
      .storage
      .with_transaction(|store| self.freshness.is_stale(store, &query, now))
  }

  fn remote_key_for_last_item(&self, state: &PagingState<T>) -> Result<Option<RemoteKey>> {
    match state.last_item() {
      Some(item) => {
        let key = item.cache_key();
        self
          .storage
          .with_transaction(|store| store.remote_keys().get::<T>(&key))
      }
      None => Ok(None),
    }
  }
}

impl<T, Q> Clone for RemoteMediator<T, Q> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      source: Arc::clone(&self.source),
      clock: Arc::clone(&self.clock),
      config: self.config,
      freshness: self.freshness,
      _query: PhantomData,
    }
  }
}
