//! Bearer token lifecycle.
//!
//! [`TokenManager`] performs the password grant against the token endpoint,
//! keeps the last good token behind a reader/writer lock and refreshes it on
//! a fixed period until cancelled or until a refresh fails.

use crate::TokenSource;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use subwatch_core::{Completion, CoreError, Credentials, RedditApiError};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    /// `expires_in` from the last grant. Logged only; refreshes run on the
    /// configured period regardless.
    pub lifetime_seconds: i64,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    fn empty() -> Self {
        Self {
            value: String::new(),
            lifetime_seconds: 0,
            fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Uninitialized,
    Active,
    /// Refresh loop exited because of cancellation.
    Stopped,
    /// Refresh loop exited because a refresh failed.
    Failed,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    token_type: String,
}

#[derive(Debug, Clone)]
pub struct TokenManager {
    http_client: Client,
    endpoint: String,
    credentials: Arc<Credentials>,
    refresh_period: Duration,
    token: Arc<RwLock<AuthToken>>,
    state: Arc<RwLock<TokenState>>,
}

impl TokenManager {
    pub fn new(
        endpoint: impl Into<String>,
        refresh_period: Duration,
        credentials: Credentials,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self::with_client(
            http_client,
            endpoint,
            refresh_period,
            credentials,
        ))
    }

    pub fn with_client(
        http_client: Client,
        endpoint: impl Into<String>,
        refresh_period: Duration,
        credentials: Credentials,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            credentials: Arc::new(credentials),
            refresh_period,
            token: Arc::new(RwLock::new(AuthToken::empty())),
            state: Arc::new(RwLock::new(TokenState::Uninitialized)),
        }
    }

    /// Fetches the first token and, only if that succeeds, spawns the
    /// refresh loop. The returned [`Completion`] fires when the loop exits,
    /// whether through `cancel` or a failed refresh.
    pub async fn start(&self, cancel: CancellationToken) -> Result<Completion, CoreError> {
        self.refresh().await?;
        *self.state.write() = TokenState::Active;

        let (done, guard) = Completion::new();
        let manager = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            manager.maintain(cancel).await;
        });

        info!(
            refresh_period_secs = self.refresh_period.as_secs(),
            "Auth token refresher started"
        );
        Ok(done)
    }

    pub fn token_value(&self) -> String {
        self.token.read().value.clone()
    }

    pub fn token(&self) -> AuthToken {
        self.token.read().clone()
    }

    pub fn state(&self) -> TokenState {
        *self.state.read()
    }

    async fn maintain(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Auth token refresher cancelled");
                    *self.state.write() = TokenState::Stopped;
                    return;
                }
                _ = sleep(self.refresh_period) => {
                    if let Err(e) = self.refresh().await {
                        error!("Error while refreshing auth token: {}", e);
                        *self.state.write() = TokenState::Failed;
                        return;
                    }
                }
            }
        }
    }

    /// The network exchange runs without holding the lock; readers keep
    /// seeing the previous token until the new one is committed.
    async fn refresh(&self) -> Result<(), CoreError> {
        let response = self.request_token().await?;

        debug!(
            expires_in = response.expires_in,
            scope = %response.scope,
            token_type = %response.token_type,
            "Received auth token"
        );

        *self.token.write() = AuthToken {
            value: response.access_token,
            lifetime_seconds: response.expires_in,
            fetched_at: Some(Utc::now()),
        };
        Ok(())
    }

    async fn request_token(&self) -> Result<AuthResponse, CoreError> {
        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.endpoint)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::network(&self.endpoint, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RedditApiError::UnexpectedAuthStatus {
                status_code: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CoreError::network(&self.endpoint, e))?;

        let auth: AuthResponse =
            serde_json::from_slice(&body).map_err(|e| RedditApiError::AuthenticationFailed {
                reason: format!("error decoding auth response: {e}"),
            })?;

        if auth.access_token.is_empty() {
            return Err(RedditApiError::AuthenticationFailed {
                reason: "auth response carried an empty access_token".to_string(),
            }
            .into());
        }

        Ok(auth)
    }
}

impl TokenSource for TokenManager {
    fn token_value(&self) -> String {
        TokenManager::token_value(self)
    }
}
