use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use crate::rate_limiter::{RateLimitState, RateLimiter};
use crate::{RedditApi, TokenSource};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subwatch_core::{ClientConfig, CoreError, ErrorExt, RedditApiError, RedditPost};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Page size requested from the new-posts listing.
pub const NEW_POSTS_LIMIT: &str = "10";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RedditListing<T> {
    #[serde(default)]
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RedditListingData<T> {
    #[serde(default)]
    pub children: Vec<RedditListingChild<T>>,
}

impl<T> Default for RedditListingData<T> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub title: String,
    /// Fullname, e.g. `t3_151rq7s`.
    pub name: String,
}

impl From<RedditPostData> for RedditPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.name,
            title: post_data.title,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub new_posts_path: String,
    pub save_post_path: String,
    pub user_agent: String,
}

impl From<&ClientConfig> for ApiSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            host: config.host.clone(),
            new_posts_path: config.new_posts_path.clone(),
            save_post_path: config.save_post_path.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Shared, rate-limited client for the listing and save endpoints.
///
/// One instance is shared by every channel worker. The sequence
/// "check quota, wait out the reset, send, record quota" runs behind a
/// single gate, so concurrent workers cannot both spend the last unit of
/// quota or stack duplicate waits.
pub struct RedditApiClient {
    http_client: Client,
    settings: ApiSettings,
    tokens: Arc<dyn TokenSource>,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
    gate: Mutex<()>,
}

impl RedditApiClient {
    pub fn new(settings: ApiSettings, tokens: Arc<dyn TokenSource>) -> Result<Self, CoreError> {
        Url::parse(&settings.host).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid API host {:?}: {e}", settings.host),
        })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http_client,
            settings,
            tokens,
            rate_limiter: Arc::new(RateLimiter::new()),
            metrics: Arc::new(MetricsCollector::new()),
            gate: Mutex::new(()),
        })
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub async fn get_rate_limit_state(&self) -> RateLimitState {
        self.rate_limiter.get_rate_limit_state().await
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, CoreError> {
        let raw = format!("{}{}", self.settings.host.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid API url {raw:?}: {e}"),
        })
    }

    /// Sends one authenticated request and hands back the open response on
    /// HTTP 200.
    ///
    /// Waiting (for the gate or for a rate limit reset) is abandoned with
    /// [`RedditApiError::WaitInterrupted`] as soon as `cancel` fires; nothing
    /// is sent in that case.
    pub async fn send_request(
        &self,
        method: Method,
        url: Url,
        params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Response, CoreError> {
        let endpoint = url.path().to_string();

        let request = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(self.tokens.token_value())
            .header(USER_AGENT, &self.settings.user_agent)
            .query(params);

        let _gate = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RedditApiError::WaitInterrupted.into()),
                    guard = self.gate.lock() => guard,
                }
            }
        };

        let wait_seconds = self.rate_limiter.time_to_wait().await;
        let rate_limited = wait_seconds > 0;
        if rate_limited {
            warn!(wait_seconds, endpoint = %endpoint, "Waiting for rate limit reset");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(endpoint = %endpoint, "Rate limit wait interrupted");
                    return Err(RedditApiError::WaitInterrupted.into());
                }
                _ = sleep(Duration::from_secs(wait_seconds)) => {
                    info!("Rate limit reset, resuming API requests");
                }
            }
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let start_time = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                self.record(&endpoint, start_time, false, rate_limited).await;
                return Err(CoreError::network(endpoint, e));
            }
        };

        match RateLimitState::from_headers(response.headers()) {
            Ok(state) => self.rate_limiter.update(state).await,
            Err(e) => {
                e.log_warn();
            }
        }

        let status = response.status();
        let success = status == StatusCode::OK;
        self.record(&endpoint, start_time, success, rate_limited).await;

        if !success {
            error!(
                "Request failed with status: {} for {} {}",
                status, method, endpoint
            );
            return Err(RedditApiError::UnexpectedStatus {
                endpoint,
                status_code: status.as_u16(),
            }
            .into());
        }

        Ok(response)
    }

    async fn record(
        &self,
        endpoint: &str,
        start_time: Instant,
        success: bool,
        rate_limited: bool,
    ) {
        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                response_time: start_time.elapsed(),
                success,
                rate_limited,
            })
            .await;
    }

    pub async fn get_new_posts(
        &self,
        subreddit: &str,
        before: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let url = self.endpoint_url(&format!(
            "/r/{}{}",
            subreddit, self.settings.new_posts_path
        ))?;
        let params = [("limit", NEW_POSTS_LIMIT), ("before", before.unwrap_or(""))];

        let response = self.send_request(Method::GET, url, &params, cancel).await?;
        let endpoint = response.url().path().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| CoreError::network(endpoint, e))?;

        let listing: RedditListing<RedditPostData> =
            serde_json::from_slice(&body).map_err(|e| {
                error!("Failed to parse subreddit posts: {}", e);
                RedditApiError::InvalidResponse {
                    details: format!("Failed to parse new posts for r/{subreddit}: {e}"),
                }
            })?;

        debug!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}

#[async_trait]
impl RedditApi for RedditApiClient {
    async fn list_new_posts(
        &self,
        subreddit: &str,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RedditPost>, CoreError> {
        let listing = self.get_new_posts(subreddit, cursor, cancel).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect())
    }

    async fn save_post(&self, id: &str, cancel: &CancellationToken) -> Result<(), CoreError> {
        let url = self.endpoint_url(&self.settings.save_post_path)?;
        // Body is not needed; dropping the response releases the connection
        self.send_request(Method::POST, url, &[("id", id)], cancel)
            .await?;
        Ok(())
    }
}
