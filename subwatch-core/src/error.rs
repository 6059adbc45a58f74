use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Invalid auth token response status: {status_code}")]
    UnexpectedAuthStatus { status_code: u16 },

    #[error("Invalid response status for {endpoint}: {status_code}")]
    UnexpectedStatus { endpoint: String, status_code: u16 },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Invalid rate limit header {header}: {details}")]
    InvalidRateLimitHeader {
        header: &'static str,
        details: String,
    },

    #[error("Waiting for rate limit reset was interrupted")]
    WaitInterrupted,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CoreError {
    /// Wraps a transport failure with the endpoint it was sent to.
    pub fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        CoreError::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn reddit_api(&self) -> Option<&RedditApiError> {
        match self {
            CoreError::RedditApi(e) => Some(e),
            _ => None,
        }
    }
}
