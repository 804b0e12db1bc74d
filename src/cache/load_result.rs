/// Observable state of an asynchronous lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult<T> {
  /// Nothing cached yet, a fetch is in flight
  Loading,
  /// Cached or freshly fetched data
  Success(T),
  /// The lookup failed and there was nothing to show instead
  Error(String),
}

#[cfg(test)]
impl<T> LoadResult<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, LoadResult::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, LoadResult::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, LoadResult::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      LoadResult::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      LoadResult::Error(e) => Some(e),
      _ => None,
    }
  }
}
