mod cache;
mod config;
mod github;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::info;

use crate::cache::{LoadResult, LoadType, MediatorResult, PagingState};
use crate::github::{User, UserDetails, UserRepository};

#[derive(Parser, Debug)]
#[command(name = "ghdir")]
#[command(about = "Browse the GitHub user directory from a local, TTL-aware cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ghdir/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List directory entries, fetching further pages only when needed
  Users {
    /// Stop after this many entries
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
  },
  /// Show one user's profile
  User { login: String },
  /// Reload the first directory page unless it is still fresh
  Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  let config = config::Config::load(args.config.as_deref())?;
  let repo = UserRepository::new(&config)?;
  info!(command = ?args.command, "starting");

  match args.command {
    Command::Users { limit } => {
      let mut users = Box::pin(repo.users().take(limit));
      while let Some(user) = users.next().await {
        print_user(&user?);
      }
    }
    Command::User { login } => {
      let mut results = Box::pin(repo.user_details(&login));
      while let Some(result) = results.next().await {
        match result {
          LoadResult::Loading => eprintln!("Loading {}...", login),
          LoadResult::Success(details) => print_details(&details),
          LoadResult::Error(message) => return Err(eyre!(message)),
        }
      }
    }
    Command::Refresh => match repo.load_page(LoadType::Refresh, &PagingState::default()).await {
      MediatorResult::Success {
        end_of_pagination_reached,
      } => {
        if end_of_pagination_reached {
          println!("Directory is empty");
        } else {
          println!("First page is up to date");
        }
      }
      MediatorResult::Error(e) => return Err(e.into()),
    },
  }

  Ok(())
}

fn print_user(user: &User) {
  println!("{:<32} {}", user.login, user.html_url);
}

fn print_details(details: &UserDetails) {
  println!("{}", details.login);
  if let Some(name) = &details.name {
    println!("  name:      {}", name);
  }
  if let Some(location) = &details.location {
    println!("  location:  {}", location);
  }
  println!("  followers: {}", details.followers);
  println!("  following: {}", details.following);
  println!("  profile:   {}", details.html_url);
  println!("  avatar:    {}", details.avatar_url);
}
