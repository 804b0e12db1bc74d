//! Demand-driven reader over a cached, paginated collection.

use async_stream::try_stream;
use futures::Stream;
use tracing::debug;

use super::error::Result;
use super::mediator::{InitializeAction, LoadType, PagingState, RemoteMediator};
use super::traits::{Cacheable, PageQuery};

/// Serves cached items page by page and asks the mediator for more only when
/// the read position reaches the end of what is stored.
pub struct Pager<T, Q> {
  mediator: RemoteMediator<T, Q>,
}

impl<T: Cacheable, Q: PageQuery> Pager<T, Q> {
  pub fn new(mediator: RemoteMediator<T, Q>) -> Self {
    Self { mediator }
  }

  /// A fresh, lazy sequence starting from the top of the collection.
  ///
  /// The first failure is yielded and ends the sequence.
  pub fn stream(&self) -> impl Stream<Item = Result<T>> + Send + 'static {
    let mediator = self.mediator.clone();

    try_stream! {
      let page_size = mediator.config().page_size;
      let storage = mediator.storage().clone();
      let mut state = PagingState::default();
      let mut end_reached = false;

      if mediator.initialize()? == InitializeAction::LaunchInitialRefresh {
        end_reached = mediator
          .load(LoadType::Refresh, &state)
          .await
          .into_result()?;
      }

      loop {
        let page: Vec<T> = storage.read_page(state.item_count() as u64, page_size)?;
        let full = page.len() == page_size as usize;

        if !page.is_empty() {
          for item in page.iter().cloned() {
            yield item;
          }
          state.pages.push(page);
        }

        if full {
          continue;
        }
        if end_reached {
          break;
        }

        end_reached = mediator
          .load(LoadType::Append, &state)
          .await
          .into_result()?;

        if !end_reached {
          let available = storage.with_transaction(|store| store.entities().count::<T>())?;
          let position = state.item_count() as u64;
          if available <= position {
            // A fresh page adds nothing, and a fetched page of already stored
            // keys only moves them, so neither grows the count
            debug!(
              available,
              position,
              "append added no unread items: page was still fresh or repeated stored keys, ending stream"
            );
            break;
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::ManualClock;
  use crate::cache::error::CacheError;
  use crate::cache::mediator::PagingConfig;
  use crate::cache::storage::SqliteStorage;
  use crate::cache::testing::{items, FakePageSource, TestItem, TestQuery};
  use futures::StreamExt;
  use std::sync::Arc;

  fn three_pages(offset: u64, _limit: u32) -> Result<Vec<TestItem>> {
    Ok(match offset {
      20 => items("a", 20),
      40 => items("b", 20),
      60 => items("c", 5),
      _ => Vec::new(),
    })
  }

  fn pager(
    source: &Arc<FakePageSource<TestItem>>,
    storage: &Arc<SqliteStorage>,
    clock: &Arc<ManualClock>,
  ) -> Pager<TestItem, TestQuery> {
    Pager::new(RemoteMediator::new(
      storage.clone(),
      source.clone(),
      clock.clone(),
      PagingConfig::default(),
    ))
  }

  fn expected() -> Vec<TestItem> {
    let mut all = items("a", 20);
    all.extend(items("b", 20));
    all.extend(items("c", 5));
    all
  }

  #[tokio::test]
  async fn test_reads_every_page_until_end() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(FakePageSource::new(three_pages));

    let results: Vec<TestItem> = pager(&source, &storage, &clock)
      .stream()
      .map(|r| r.unwrap())
      .collect()
      .await;

    assert_eq!(results, expected());
    assert_eq!(
      source.requests(),
      vec![(20, 20), (40, 20), (60, 20), (80, 20)]
    );
  }

  #[tokio::test]
  async fn test_only_fetches_on_demand() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(FakePageSource::new(three_pages));
    let pager = pager(&source, &storage, &clock);

    let first: Vec<_> = pager.stream().take(20).collect().await;
    assert_eq!(first.len(), 20);
    assert_eq!(source.calls(), 1);

    let more: Vec<_> = pager.stream().take(21).collect().await;
    assert_eq!(more.len(), 21);
    assert_eq!(source.calls(), 2);
  }

  #[tokio::test]
  async fn test_second_read_within_ttl_is_served_from_cache() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(FakePageSource::new(three_pages));
    let pager = pager(&source, &storage, &clock);

    let _: Vec<_> = pager.stream().collect().await;
    assert_eq!(source.calls(), 4);

    clock.advance(chrono::Duration::minutes(1));
    let again: Vec<TestItem> = pager.stream().map(|r| r.unwrap()).collect().await;

    assert_eq!(again, expected());
    assert_eq!(source.calls(), 4);
  }

  #[tokio::test]
  async fn test_page_of_known_keys_ends_stream() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    // Every page repeats the same twenty keys
    let source = Arc::new(FakePageSource::new(|_, _| Ok(items("a", 20))));

    let results: Vec<TestItem> = pager(&source, &storage, &clock)
      .stream()
      .map(|r| r.unwrap())
      .collect()
      .await;

    assert_eq!(results, items("a", 20));
    assert_eq!(source.requests(), vec![(20, 20), (40, 20)]);
  }

  #[tokio::test]
  async fn test_refresh_failure_ends_stream_with_error() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(FakePageSource::new(|_, _| {
      Err(CacheError::network("offline"))
    }));

    let results: Vec<_> = pager(&source, &storage, &clock).stream().collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(CacheError::Network(_))));
  }

  #[tokio::test]
  async fn test_append_failure_after_cached_items() {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new());
    let source = Arc::new(FakePageSource::new(three_pages));
    let pager = pager(&source, &storage, &clock);
    let _: Vec<_> = pager.stream().take(20).collect().await;

    source.respond_with(|offset, _| {
      if offset == 20 {
        Ok(items("a", 20))
      } else {
        Err(CacheError::network("offline"))
      }
    });
    let results: Vec<_> = pager.stream().collect().await;

    assert_eq!(results.len(), 21);
    assert!(results[..20].iter().all(|r| r.is_ok()));
    assert!(results[20].is_err());
  }
}
