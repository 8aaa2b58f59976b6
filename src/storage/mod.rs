mod db;
mod feeds;
mod types;

pub use db::Database;
pub use types::{FeedRecord, FeedUpdate, StoreError};
