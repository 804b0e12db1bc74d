//! User directory repository: the GitHub client behind the local cache.

use color_eyre::Result as EyreResult;
use futures::Stream;
use std::sync::Arc;

use crate::cache::{
  Clock, DetailLoader, DetailSource, LoadResult, LoadType, MediatorResult, PageSource, Pager,
  PagingState, RemoteMediator, Result, SqliteStorage, SystemClock,
};
use crate::config::{CacheConfig, Config};

use super::cache::UsersPageKey;
use super::client::GithubClient;
use super::types::{User, UserDetails};

/// Directory and profile lookups with transparent caching.
///
/// Pages and profiles are served from the local store while fresh and
/// fetched from GitHub otherwise; the store survives restarts.
#[derive(Clone)]
pub struct UserRepository {
  mediator: RemoteMediator<User, UsersPageKey>,
  details: DetailLoader<UserDetails>,
}

impl UserRepository {
  /// Create a repository backed by GitHub and the on-disk cache.
  pub fn new(config: &Config) -> EyreResult<Self> {
    let client = Arc::new(GithubClient::new(config)?);
    let path = match &config.cache.path {
      Some(path) => path.clone(),
      None => SqliteStorage::default_path()?,
    };
    let storage = Arc::new(SqliteStorage::open(&path)?);

    Ok(Self::with_parts(
      storage,
      client.clone(),
      client,
      Arc::new(SystemClock),
      &config.cache,
    ))
  }

  pub fn with_parts(
    storage: Arc<SqliteStorage>,
    pages: Arc<dyn PageSource<User>>,
    details: Arc<dyn DetailSource<UserDetails>>,
    clock: Arc<dyn Clock>,
    cache: &CacheConfig,
  ) -> Self {
    let mediator = RemoteMediator::new(
      Arc::clone(&storage),
      pages,
      Arc::clone(&clock),
      cache.paging(),
    );
    let details = DetailLoader::new(storage, details, clock, cache.detail_ttl());

    Self { mediator, details }
  }

  /// Lazily read the directory, fetching further pages as they are reached.
  pub fn users(&self) -> impl Stream<Item = Result<User>> + Send + 'static {
    Pager::new(self.mediator.clone()).stream()
  }

  /// Run a single page load against the caller's current window.
  pub async fn load_page(&self, load_type: LoadType, state: &PagingState<User>) -> MediatorResult {
    self.mediator.load(load_type, state).await
  }

  /// Cached profile first, then the refreshed one when it was missing or stale.
  pub fn user_details(
    &self,
    login: &str,
  ) -> impl Stream<Item = LoadResult<UserDetails>> + Send + 'static {
    self.details.load(login)
  }
}
