pub mod api;
pub mod auth;
pub mod metrics;
pub mod rate_limiter;


pub use api::{ApiSettings, RedditApiClient};
pub use auth::{AuthToken, TokenManager, TokenState};
pub use rate_limiter::{RateLimitState, RateLimiter};

use async_trait::async_trait;
use subwatch_core::{CoreError, RedditPost};
use tokio_util::sync::CancellationToken;

/// Read access to the current bearer token.
pub trait TokenSource: Send + Sync {
    /// The most recently committed token value; empty before the first
    /// successful fetch.
    fn token_value(&self) -> String;
}

/// The two provider operations a channel worker needs.
#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Newest-first posts published after `cursor` (or the most recent
    /// posts when `cursor` is `None`).
    async fn list_new_posts(
        &self,
        subreddit: &str,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RedditPost>, CoreError>;

    async fn save_post(&self, id: &str, cancel: &CancellationToken) -> Result<(), CoreError>;
}
