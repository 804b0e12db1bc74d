use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result as EyreResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::cache::{CacheError, DetailSource, PageSource, Result};
use crate::config::Config;

use super::api_types::{ApiUser, ApiUserDetails};
use super::types::{User, UserDetails};

/// GitHub REST API client
#[derive(Clone)]
pub struct GithubClient {
  client: reqwest::Client,
  base_url: Url,
}

impl GithubClient {
  pub fn new(config: &Config) -> EyreResult<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(
      ACCEPT,
      HeaderValue::from_static("application/vnd.github+json"),
    );
    if let Some(token) = Config::get_api_token() {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid GitHub token: {}", e))?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
      .user_agent(concat!("ghdir/", env!("CARGO_PKG_VERSION")))
      .default_headers(headers)
      .timeout(Duration::from_secs(config.github.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create GitHub client: {}", e))?;

    let base_url = Url::parse(&config.github.api_url)
      .map_err(|e| eyre!("Invalid GitHub API url {}: {}", config.github.api_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid GitHub API url {}", config.github.api_url));
    }

    Ok(Self { client, base_url })
  }

  /// List users, starting after the user id `since`
  pub async fn get_users(&self, since: u64, per_page: u32) -> Result<Vec<User>> {
    let mut url = self.endpoint(&["users"]);
    url
      .query_pairs_mut()
      .append_pair("since", &since.to_string())
      .append_pair("per_page", &per_page.to_string());

    let users: Vec<ApiUser> = self.get_json(url).await?;
    debug!(since, per_page, count = users.len(), "fetched user page");

    Ok(users.into_iter().map(User::from).collect())
  }

  /// Get a single user's profile by login
  pub async fn get_user(&self, login: &str) -> Result<UserDetails> {
    let url = self.endpoint(&["users", login]);

    match self.get_json::<ApiUserDetails>(url).await {
      Err(CacheError::NotFound(_)) => Err(CacheError::NotFound(login.to_string())),
      other => other.map(UserDetails::from),
    }
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // Checked in new(): the base url can carry path segments
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(CacheError::network)?;

    if response.status() == StatusCode::NOT_FOUND {
      return Err(CacheError::NotFound(url.path().to_string()));
    }

    response
      .error_for_status()
      .map_err(CacheError::network)?
      .json::<T>()
      .await
      .map_err(CacheError::network)
  }
}

#[async_trait]
impl PageSource<User> for GithubClient {
  async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<User>> {
    self.get_users(offset, limit).await
  }
}

#[async_trait]
impl DetailSource<UserDetails> for GithubClient {
  async fn fetch_detail(&self, key: &str) -> Result<UserDetails> {
    self.get_user(key).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(api_url: &str) -> GithubClient {
    let mut config = Config::default();
    config.github.api_url = api_url.to_string();
    GithubClient::new(&config).unwrap()
  }

  #[test]
  fn test_endpoint_joins_segments() {
    let github = client("https://api.github.com");
    assert_eq!(
      github.endpoint(&["users", "octocat"]).as_str(),
      "https://api.github.com/users/octocat"
    );
  }

  #[test]
  fn test_endpoint_keeps_enterprise_prefix() {
    let github = client("https://ghe.example.com/api/v3/");
    assert_eq!(
      github.endpoint(&["users"]).as_str(),
      "https://ghe.example.com/api/v3/users"
    );
  }

  #[test]
  fn test_endpoint_escapes_login() {
    let github = client("https://api.github.com");
    assert_eq!(
      github.endpoint(&["users", "a/b"]).as_str(),
      "https://api.github.com/users/a%2Fb"
    );
  }

  #[test]
  fn test_rejects_invalid_api_url() {
    let mut config = Config::default();
    config.github.api_url = "not a url".to_string();
    assert!(GithubClient::new(&config).is_err());
  }
}
