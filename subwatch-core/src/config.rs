//! Service configuration.
//!
//! Endpoints, periods and subreddits come from a TOML file; the four
//! credential values come from the environment so they never live on disk.

use crate::error::ConfigError;
use crate::types::{ChannelConfig, Credentials};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CLIENT_ID_VAR: &str = "REDDITAPI_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDITAPI_CLIENT_SECRET";
pub const USERNAME_VAR: &str = "REDDITAPI_USERNAME";
pub const PASSWORD_VAR: &str = "REDDITAPI_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Full URL of the token endpoint.
    pub host: String,
    /// Seconds between token refreshes.
    pub request_period: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub user_agent: String,
    pub new_posts_path: String,
    pub save_post_path: String,
    /// Seconds between polls of each subreddit.
    pub request_period: u64,
    #[serde(default)]
    pub subreddits: Vec<SubredditConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubredditConfig {
    pub name: String,
    /// Comma separated, matched verbatim.
    pub keywords: String,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.host".to_string(),
                value: self.auth.host.clone(),
            });
        }
        if self.client.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "client.host".to_string(),
                value: self.client.host.clone(),
            });
        }
        if self.auth.request_period == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.request_period".to_string(),
                value: "0".to_string(),
            });
        }
        if self.client.request_period == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.request_period".to_string(),
                value: "0".to_string(),
            });
        }
        if self.client.subreddits.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "no subreddits configured".to_string(),
            });
        }
        if let Some(sub) = self.client.subreddits.iter().find(|s| s.name.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "client.subreddits.name".to_string(),
                value: sub.name.clone(),
            });
        }
        Ok(())
    }

    pub fn token_refresh_period(&self) -> Duration {
        Duration::from_secs(self.auth.request_period)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.client.request_period)
    }

    /// One channel per configured subreddit, all sharing the client poll period.
    pub fn channels(&self) -> Vec<ChannelConfig> {
        self.client
            .subreddits
            .iter()
            .map(|sub| {
                ChannelConfig::from_keyword_list(&sub.name, &sub.keywords, self.poll_period())
            })
            .collect()
    }
}

impl Credentials {
    /// Read credentials from the `REDDITAPI_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: name.to_string(),
            })
        };

        Ok(Self {
            client_id: require(CLIENT_ID_VAR)?,
            client_secret: require(CLIENT_SECRET_VAR)?,
            username: require(USERNAME_VAR)?,
            password: require(PASSWORD_VAR)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[auth]
host = "https://www.reddit.com/api/v1/access_token"
request_period = 3000

[client]
host = "https://oauth.reddit.com"
user_agent = "subwatch/0.1 by tester"
new_posts_path = "/new"
save_post_path = "/api/save"
request_period = 60

[[client.subreddits]]
name = "rust"
keywords = "tokio,async"

[[client.subreddits]]
name = "golang"
keywords = "generics"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.auth.request_period, 3000);
        assert_eq!(config.token_refresh_period(), Duration::from_secs(3000));
        assert_eq!(config.client.new_posts_path, "/new");

        let channels = config.channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "rust");
        assert_eq!(channels[0].keywords, vec!["tokio", "async"]);
        assert_eq!(channels[1].poll_period, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_period_rejected() {
        let content = SAMPLE.replace("request_period = 60", "request_period = 0");
        let err = AppConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "client.request_period"
        ));
    }

    #[test]
    fn test_missing_subreddits_rejected() {
        let content = SAMPLE.split("[[client.subreddits]]").next().unwrap();
        let err = AppConfig::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[auth\nhost = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (USERNAME_VAR, "user"),
            (PASSWORD_VAR, "pass"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.password, "pass");
    }

    #[test]
    fn test_credentials_missing_variable() {
        let err = Credentials::from_lookup(|name| {
            (name != PASSWORD_VAR).then(|| "value".to_string())
        })
        .unwrap_err();

        match err {
            ConfigError::MissingEnvironmentVariable { var_name } => {
                assert_eq!(var_name, PASSWORD_VAR)
            }
            other => panic!("Expected MissingEnvironmentVariable, got {other:?}"),
        }
    }
}
