//! Serde-deserializable types matching GitHub REST API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{User, UserDetails};

/// Item of `GET /users`
#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub login: String,
  pub avatar_url: String,
  pub html_url: String,
}

impl From<ApiUser> for User {
  fn from(user: ApiUser) -> Self {
    User {
      login: user.login,
      avatar_url: user.avatar_url,
      html_url: user.html_url,
    }
  }
}

/// Body of `GET /users/{login}`
#[derive(Debug, Deserialize)]
pub struct ApiUserDetails {
  pub login: String,
  pub name: Option<String>,
  pub avatar_url: String,
  pub html_url: String,
  pub location: Option<String>,
  #[serde(default)]
  pub followers: u32,
  #[serde(default)]
  pub following: u32,
}

impl From<ApiUserDetails> for UserDetails {
  fn from(details: ApiUserDetails) -> Self {
    UserDetails {
      login: details.login,
      name: details.name,
      avatar_url: details.avatar_url,
      html_url: details.html_url,
      location: details.location,
      followers: details.followers,
      following: details.following,
    }
  }
}
