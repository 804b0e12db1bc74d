//! Test doubles shared by the cache tests.

use async_trait::async_trait;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Mutex;

pub use super::clock::ManualClock;
use super::error::Result;
use super::traits::{Cacheable, DetailSource, PageQuery, PageSource, QueryKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestItem {
  pub key: String,
  pub value: String,
}

impl TestItem {
  pub fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      value: format!("value of {}", key),
    }
  }
}

impl Cacheable for TestItem {
  fn cache_key(&self) -> String {
    self.key.clone()
  }

  fn entity_type() -> &'static str {
    "test_item"
  }
}

/// `count` items named `{prefix}{n}`.
pub fn items(prefix: &str, count: usize) -> Vec<TestItem> {
  (0..count)
    .map(|n| TestItem::new(&format!("{}{}", prefix, n)))
    .collect()
}

/// Entity whose serialization can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Poisonable {
  pub key: String,
  pub poisoned: bool,
}

impl Poisonable {
  pub fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      poisoned: false,
    }
  }

  pub fn poisoned(key: &str) -> Self {
    Self {
      key: key.to_string(),
      poisoned: true,
    }
  }
}

impl Serialize for Poisonable {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if self.poisoned {
      return Err(S::Error::custom("poisoned entity"));
    }
    let mut state = serializer.serialize_struct("Poisonable", 2)?;
    state.serialize_field("key", &self.key)?;
    state.serialize_field("poisoned", &self.poisoned)?;
    state.end()
  }
}

impl Cacheable for Poisonable {
  fn cache_key(&self) -> String {
    self.key.clone()
  }

  fn entity_type() -> &'static str {
    "poisonable"
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestQuery(pub u32);

impl QueryKey for TestQuery {
  fn cache_hash(&self) -> String {
    format!("test/page={}", self.0)
  }

  fn description(&self) -> String {
    format!("test page {}", self.0)
  }
}

impl PageQuery for TestQuery {
  fn for_page(page: u32) -> Self {
    TestQuery(page)
  }
}

type PageResponder<T> = Box<dyn FnMut(u64, u32) -> Result<Vec<T>> + Send>;

/// Page source that answers from a closure and records every request.
pub struct FakePageSource<T> {
  responder: Mutex<PageResponder<T>>,
  requests: Mutex<Vec<(u64, u32)>>,
}

impl<T> FakePageSource<T> {
  pub fn new(responder: impl FnMut(u64, u32) -> Result<Vec<T>> + Send + 'static) -> Self {
    Self {
      responder: Mutex::new(Box::new(responder)),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn respond_with(&self, responder: impl FnMut(u64, u32) -> Result<Vec<T>> + Send + 'static) {
    *self.responder.lock().unwrap() = Box::new(responder);
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn requests(&self) -> Vec<(u64, u32)> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl<T: Send + Sync + 'static> PageSource<T> for FakePageSource<T> {
  async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<T>> {
    self.requests.lock().unwrap().push((offset, limit));
    // Give concurrent loads a chance to run between request and response
    tokio::task::yield_now().await;
    let mut responder = self.responder.lock().unwrap();
    (*responder)(offset, limit)
  }
}

type DetailResponder<T> = Box<dyn FnMut(&str) -> Result<T> + Send>;

/// Detail source that answers from a closure and records every request.
pub struct FakeDetailSource<T> {
  responder: Mutex<DetailResponder<T>>,
  requests: Mutex<Vec<String>>,
}

impl<T> FakeDetailSource<T> {
  pub fn new(responder: impl FnMut(&str) -> Result<T> + Send + 'static) -> Self {
    Self {
      responder: Mutex::new(Box::new(responder)),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

#[async_trait]
impl<T: Send + Sync + 'static> DetailSource<T> for FakeDetailSource<T> {
  async fn fetch_detail(&self, key: &str) -> Result<T> {
    self.requests.lock().unwrap().push(key.to_string());
    let mut responder = self.responder.lock().unwrap();
    (*responder)(key)
  }
}

/// Source whose requests never complete.
pub struct PendingSource;

#[async_trait]
impl<T: Send + 'static> PageSource<T> for PendingSource {
  async fn fetch_page(&self, _offset: u64, _limit: u32) -> Result<Vec<T>> {
    std::future::pending().await
  }
}

#[async_trait]
impl<T: Send + 'static> DetailSource<T> for PendingSource {
  async fn fetch_detail(&self, _key: &str) -> Result<T> {
    std::future::pending().await
  }
}
