use serde::{Deserialize, Serialize};

/// Directory entry for list views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub login: String,
  pub avatar_url: String,
  pub html_url: String,
}

/// Full profile of a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
  pub login: String,
  pub name: Option<String>,
  pub avatar_url: String,
  pub html_url: String,
  pub location: Option<String>,
  pub followers: u32,
  pub following: u32,
}
