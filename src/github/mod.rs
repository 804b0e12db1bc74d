mod api_types;
mod cache;
mod client;
mod repository;
mod types;

pub use repository::UserRepository;
pub use types::{User, UserDetails};
