use crate::error::*;
use tracing::warn;

pub trait ErrorExt {
    /// Logs at warn level for failures that only cost the current call.
    fn log_warn(&self) -> &Self;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_warn(&self) -> &Self {
        match self {
            CoreError::RedditApi(e) => {
                e.log_warn();
            }
            CoreError::Config(e) => {
                e.log_warn();
            }
            CoreError::Network { endpoint, source } => {
                warn!(endpoint = %endpoint, "Network error: {:?}", source);
            }
            _ => warn!("CoreError (warning): {}", self),
        }
        self
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Network { .. } => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "RedditApiError (warning): {}", self);
        self
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::UnexpectedAuthStatus { .. } => "REDDIT_AUTH_STATUS".to_string(),
            RedditApiError::UnexpectedStatus { .. } => "REDDIT_UNEXPECTED_STATUS".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::InvalidRateLimitHeader { .. } => {
                "REDDIT_INVALID_RATE_LIMIT_HEADER".to_string()
            }
            RedditApiError::WaitInterrupted => "REDDIT_WAIT_INTERRUPTED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::Read { .. } => "CONFIG_READ_FAILED".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
