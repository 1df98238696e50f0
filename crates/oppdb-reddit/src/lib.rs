//! Reddit-backed submission source for oppdb.
//!
//! Exchanges app credentials for an OAuth token, then pages through
//! subreddit listings until the requested number of posts is collected.

mod client;
mod error;
mod listing;
mod source;

pub use client::{RedditClient, RedditCredentials, DEFAULT_API_BASE, DEFAULT_TOKEN_URL};
pub use error::RedditError;
pub use source::RedditSource;
