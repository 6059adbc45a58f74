use reddit_client::RedditApi;
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{ChannelConfig, ErrorExt, RedditApiError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What a single poll-and-filter cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Listing failed; the cycle was abandoned until the next tick.
    FetchFailed,
    NoNewPosts,
    Processed {
        fetched: usize,
        matched: usize,
        saved: usize,
    },
}

/// Polls one subreddit and saves posts whose titles contain a keyword.
///
/// The cursor only ever moves forward to the newest post of the latest
/// successful fetch and is never shared with other workers.
pub struct ChannelWorker {
    channel: ChannelConfig,
    cursor: Option<String>,
    client: Arc<dyn RedditApi>,
}

impl ChannelWorker {
    pub fn new(channel: ChannelConfig, client: Arc<dyn RedditApi>) -> Self {
        Self {
            channel,
            cursor: None,
            client,
        }
    }

    pub fn subreddit(&self) -> &str {
        &self.channel.name
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Runs one cycle straight away, then one per poll period until
    /// `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(subreddit = %self.channel.name, "Start worker");

        // interval_at panics on a zero period
        let period = if self.channel.poll_period.is_zero() {
            warn!(subreddit = %self.channel.name, "Zero poll period, using 1s");
            Duration::from_secs(1)
        } else {
            self.channel.poll_period
        };

        self.poll_cycle(&cancel).await;

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.poll_cycle(&cancel).await;
                }
            }
        }

        info!(subreddit = %self.channel.name, "Worker stopped");
    }

    pub async fn poll_cycle(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        let subreddit = self.channel.name.as_str();

        let posts = match self
            .client
            .list_new_posts(subreddit, self.cursor.as_deref(), cancel)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                if e.reddit_api() == Some(&RedditApiError::WaitInterrupted) {
                    info!(subreddit, "Fetch interrupted by shutdown");
                } else {
                    e.log_warn();
                    info!(subreddit, "Skipping cycle after failed fetch");
                }
                return CycleOutcome::FetchFailed;
            }
        };

        let Some(newest) = posts.first() else {
            info!(subreddit, "No new posts");
            return CycleOutcome::NoNewPosts;
        };

        info!(subreddit, count = posts.len(), "Found new posts");
        // Listing is newest-first
        self.cursor = Some(newest.id.clone());

        let mut matched = 0;
        let mut saved = 0;
        for post in &posts {
            let Some(keyword) = self.channel.matching_keyword(&post.title) else {
                continue;
            };

            matched += 1;
            info!(subreddit, post_id = %post.id, keyword, "Save post");
            match self.client.save_post(&post.id, cancel).await {
                Ok(()) => saved += 1,
                Err(e) => {
                    e.log_warn();
                    warn!(subreddit, post_id = %post.id, "Failed to save post");
                }
            }
        }

        CycleOutcome::Processed {
            fetched: posts.len(),
            matched,
            saved,
        }
    }
}
