pub mod worker;

pub use worker::{ChannelWorker, CycleOutcome};

use futures::future::join_all;
use reddit_client::metrics::ApiMetrics;
use reddit_client::{ApiSettings, RedditApi, RedditApiClient, TokenManager};
use std::sync::Arc;
use subwatch_core::{AppConfig, ChannelConfig, Completion, CoreError, Credentials};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Why the service stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The external shutdown token fired.
    Signal,
    /// The token refresher exited on its own, which only happens when a
    /// refresh fails.
    AuthRefreshStopped,
}

pub struct BackgroundService {
    config: AppConfig,
    credentials: Credentials,
}

impl BackgroundService {
    pub fn new(config: AppConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Starts the token refresher and one worker per subreddit, then blocks
    /// until everything has stopped.
    ///
    /// Returns an error only if startup fails, most notably when the first
    /// token fetch is rejected; no worker is started in that case.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<ShutdownCause, CoreError> {
        let tokens = Arc::new(TokenManager::new(
            self.config.auth.host.as_str(),
            self.config.token_refresh_period(),
            self.credentials.clone(),
        )?);
        // Before start(): nothing to tear down if the settings are rejected
        let client = Arc::new(RedditApiClient::new(
            ApiSettings::from(&self.config.client),
            tokens.clone(),
        )?);

        let refresher = tokens.start(shutdown.clone()).await?;
        info!(
            lifetime_seconds = tokens.token().lifetime_seconds,
            "Initial auth token acquired"
        );

        let cause = supervise(refresher, client.clone(), self.config.channels(), shutdown).await;
        log_usage_summary(&client.get_metrics().await);

        Ok(cause)
    }
}

fn log_usage_summary(metrics: &ApiMetrics) {
    info!(
        total_requests = metrics.total_requests,
        successful_requests = metrics.successful_requests,
        failed_requests = metrics.failed_requests,
        rate_limited_requests = metrics.rate_limited_requests,
        "API usage summary"
    );

    let mut endpoints: Vec<_> = metrics.requests_by_endpoint.iter().collect();
    endpoints.sort_by(|a, b| a.0.cmp(b.0));
    for (endpoint, stats) in endpoints {
        info!(
            endpoint = %endpoint,
            requests = stats.request_count,
            errors = stats.error_count,
            success_rate = stats.success_rate(),
            avg_response_ms = stats.average_response_time().as_millis() as u64,
            "Endpoint usage"
        );
    }
}

/// Runs one [`ChannelWorker`] per channel until `shutdown` fires or the
/// token refresher completes, whichever comes first. A refresher exit
/// cancels `shutdown` so the workers follow it down.
///
/// Waits for every worker and then for the refresher before returning.
pub async fn supervise(
    refresher: Completion,
    client: Arc<dyn RedditApi>,
    channels: Vec<ChannelConfig>,
    shutdown: CancellationToken,
) -> ShutdownCause {
    let handles: Vec<_> = channels
        .into_iter()
        .map(|channel| {
            let span = info_span!("channel", subreddit = %channel.name);
            let mut worker = ChannelWorker::new(channel, client.clone());
            let cancel = shutdown.clone();
            tokio::spawn(async move { worker.run(cancel).await }.instrument(span))
        })
        .collect();

    info!(workers = handles.len(), "Channel workers started");

    let cause = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            info!("Shutdown signal received");
            ShutdownCause::Signal
        }
        _ = refresher.wait() => {
            warn!("Auth token refresher stopped, shutting down workers");
            shutdown.cancel();
            ShutdownCause::AuthRefreshStopped
        }
    };

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!("Channel worker task failed: {}", e);
        }
    }
    refresher.wait().await;

    info!("Gracefully shut down");
    cause
}
