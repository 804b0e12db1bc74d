//! Caching implementations for GitHub types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, PageQuery, QueryKey};

use super::types::{User, UserDetails};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for User {
  fn cache_key(&self) -> String {
    self.login.clone()
  }

  fn entity_type() -> &'static str {
    "user"
  }
}

impl Cacheable for UserDetails {
  fn cache_key(&self) -> String {
    self.login.clone()
  }

  fn entity_type() -> &'static str {
    "user_detail"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// One page of the user directory listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsersPageKey {
  pub page: u32,
}

impl QueryKey for UsersPageKey {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.description().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    format!("users/since=0&page={}", self.page)
  }
}

impl PageQuery for UsersPageKey {
  fn for_page(page: u32) -> Self {
    Self { page }
  }
}
