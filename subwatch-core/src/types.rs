use std::fmt;
use std::time::Duration;

/// A post as returned by the new-posts listing. `id` is the provider's
/// fullname (e.g. `t3_abc123`), which is what both the cursor and the save
/// endpoint expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
}

/// Script-app credentials used for the password grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: String,
    pub keywords: Vec<String>,
    pub poll_period: Duration,
}

impl ChannelConfig {
    /// Builds a channel from a comma separated keyword string.
    ///
    /// Keywords are split on a literal `,` and are not trimmed, so
    /// `"rust, tokio"` yields `"rust"` and `" tokio"`.
    pub fn from_keyword_list(
        name: impl Into<String>,
        keywords: &str,
        poll_period: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.split(',').map(String::from).collect(),
            poll_period,
        }
    }

    /// Returns the first keyword contained in `title`, if any.
    /// Matching is a case-sensitive substring test.
    pub fn matching_keyword(&self, title: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| title.contains(keyword.as_str()))
            .map(String::as_str)
    }
}
