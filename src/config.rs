use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::PagingConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub github: GithubConfig,
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
  /// REST API root, e.g. for GitHub Enterprise "https://ghe.example.com/api/v3"
  pub api_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for GithubConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.github.com".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Database location (default: $XDG_DATA_HOME/ghdir/cache.db)
  pub path: Option<PathBuf>,
  pub page_size: u32,
  pub starting_page: u32,
  /// How long a directory page stays fresh
  pub ttl_secs: u64,
  /// How long a user profile stays fresh
  pub detail_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      page_size: 20,
      starting_page: 1,
      ttl_secs: 5 * 60,
      detail_ttl_secs: 5 * 60,
    }
  }
}

/// Longest accepted TTL: one year.
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl CacheConfig {
  pub fn paging(&self) -> PagingConfig {
    PagingConfig {
      page_size: self.page_size,
      starting_page: self.starting_page,
      ttl: ttl_from_secs(self.ttl_secs),
    }
  }

  pub fn detail_ttl(&self) -> Duration {
    ttl_from_secs(self.detail_ttl_secs)
  }
}

/// Out-of-range values saturate instead of panicking; `validate` rejects them.
fn ttl_from_secs(secs: u64) -> Duration {
  i64::try_from(secs)
    .ok()
    .and_then(Duration::try_seconds)
    .unwrap_or(Duration::MAX)
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ghdir.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ghdir/config.yaml
  ///
  /// Without any file the defaults are used; the public API needs no setup.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ghdir.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ghdir").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.page_size == 0 {
      return Err(eyre!("cache.page_size must be greater than zero"));
    }
    if self.cache.ttl_secs > MAX_TTL_SECS {
      return Err(eyre!("cache.ttl_secs must be at most {}", MAX_TTL_SECS));
    }
    if self.cache.detail_ttl_secs > MAX_TTL_SECS {
      return Err(eyre!("cache.detail_ttl_secs must be at most {}", MAX_TTL_SECS));
    }
    if self.github.api_url.trim().is_empty() {
      return Err(eyre!("github.api_url must not be empty"));
    }
    Ok(())
  }

  /// Get the GitHub API token from environment variables, if any.
  ///
  /// Checks GHDIR_GITHUB_TOKEN first, then GITHUB_TOKEN as fallback.
  /// Unauthenticated requests work too, with a lower rate limit.
  pub fn get_api_token() -> Option<String> {
    std::env::var("GHDIR_GITHUB_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .ok()
      .filter(|token| !token.trim().is_empty())
  }
}
