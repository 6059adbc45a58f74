use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use subwatch_core::RedditApiError;
use tokio::sync::Mutex;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const USED_HEADER: &str = "x-ratelimit-used";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota telemetry reported by the provider on every API response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: f64,
    pub used: u64,
    pub reset_seconds: u64,
}

impl RateLimitState {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RedditApiError> {
        Ok(Self {
            remaining: parse_header(headers, REMAINING_HEADER)?,
            used: parse_header(headers, USED_HEADER)?,
            reset_seconds: parse_header(headers, RESET_HEADER)?,
        })
    }

    /// Seconds to hold off before the next request: the reset window once
    /// the quota is spent, otherwise zero.
    pub fn time_to_wait(&self) -> u64 {
        if self.remaining <= 0.0 {
            self.reset_seconds
        } else {
            0
        }
    }
}

fn parse_header<T>(headers: &HeaderMap, name: &'static str) -> Result<T, RedditApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = headers
        .get(name)
        .ok_or_else(|| RedditApiError::InvalidRateLimitHeader {
            header: name,
            details: "header missing".to_string(),
        })?;

    let text = value
        .to_str()
        .map_err(|e| RedditApiError::InvalidRateLimitHeader {
            header: name,
            details: e.to_string(),
        })?;

    text.trim()
        .parse::<T>()
        .map_err(|e| RedditApiError::InvalidRateLimitHeader {
            header: name,
            details: format!("{text:?}: {e}"),
        })
}

/// Holds the most recently observed [`RateLimitState`].
///
/// Each read and write is serialized, but nothing here orders a check
/// against the send that follows it; see `RedditApiClient` for the gate
/// that makes check-wait-send-update atomic.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored state wholesale. Last write wins.
    pub async fn update(&self, state: RateLimitState) {
        *self.state.lock().await = state;
    }

    pub async fn time_to_wait(&self) -> u64 {
        self.state.lock().await.time_to_wait()
    }

    pub async fn get_rate_limit_state(&self) -> RateLimitState {
        *self.state.lock().await
    }
}
