//! Reddit API client (client-credentials OAuth).

use std::time::Duration;

use oppdb_core::{AppConfig, ConfigError, Submission};
use serde::Deserialize;

use crate::error::RedditError;
use crate::listing::{to_submission, Listing};

pub const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit caps listing pages at 100 children.
const MAX_PAGE_SIZE: usize = 100;
/// Upper bound on pages per listing so a misbehaving cursor cannot loop.
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// App credentials for the client-credentials grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditCredentials {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first missing
    /// `REDDIT_*` variable.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let required = |value: &Option<String>, var: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
        };
        Ok(Self {
            client_id: required(&config.reddit_client_id, "REDDIT_CLIENT_ID")?,
            client_secret: required(&config.reddit_client_secret, "REDDIT_CLIENT_SECRET")?,
            user_agent: required(&config.reddit_user_agent, "REDDIT_USER_AGENT")?,
        })
    }
}

/// Reddit API client holding a valid access token.
pub struct RedditClient {
    client: reqwest::Client,
    token: String,
    user_agent: String,
    api_base: String,
}

impl RedditClient {
    /// Exchange `credentials` for a token against the public endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Auth`] if the token exchange is refused.
    pub async fn connect(credentials: &RedditCredentials) -> Result<Self, RedditError> {
        Self::connect_with_base_url(credentials, DEFAULT_TOKEN_URL, DEFAULT_API_BASE).await
    }

    /// Like [`RedditClient::connect`] with explicit endpoints (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Auth`] if the token exchange is refused.
    pub async fn connect_with_base_url(
        credentials: &RedditCredentials,
        token_url: &str,
        api_base: &str,
    ) -> Result<Self, RedditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let token = Self::fetch_token(&client, credentials, token_url).await?;

        Ok(Self {
            client,
            token,
            user_agent: credentials.user_agent.clone(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_token(
        client: &reqwest::Client,
        credentials: &RedditCredentials,
        token_url: &str,
    ) -> Result<String, RedditError> {
        let response = client
            .post(token_url)
            .header("User-Agent", &credentials.user_agent)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RedditError::Auth(format!(
                "status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RedditError::Auth(format!("token parse error: {e}")))?;
        Ok(token.access_token)
    }

    /// Collect up to `limit` posts from `/r/{subreddit}/{sort}`, following
    /// `after` cursors. Skipped posts do not count toward `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::Api`] for a non-2xx listing response or
    /// [`RedditError::Parse`] for an unreadable one.
    pub async fn listing(
        &self,
        subreddit: &str,
        sort: &str,
        limit: usize,
    ) -> Result<Vec<Submission>, RedditError> {
        let endpoint = format!("{}/r/{subreddit}/{sort}", self.api_base);
        let mut after: Option<String> = None;
        let mut submissions = Vec::new();

        for _ in 0..MAX_PAGES {
            if submissions.len() >= limit {
                break;
            }
            let page_size = (limit - submissions.len()).min(MAX_PAGE_SIZE);
            let mut params: Vec<(&str, String)> = vec![
                ("limit", page_size.to_string()),
                ("raw_json", "1".to_string()),
            ];
            if let Some(cursor) = &after {
                params.push(("after", cursor.clone()));
            }

            let response = self
                .client
                .get(&endpoint)
                .bearer_auth(&self.token)
                .header("User-Agent", &self.user_agent)
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(RedditError::Api {
                    status: response.status().as_u16(),
                    endpoint: format!("/r/{subreddit}/{sort}"),
                });
            }

            let listing: Listing = response
                .json()
                .await
                .map_err(|e| RedditError::Parse(e.to_string()))?;

            let page_len = listing.data.children.len();
            submissions.extend(
                listing
                    .data
                    .children
                    .iter()
                    .filter_map(|post| to_submission(post, subreddit)),
            );

            after = listing.data.after;
            if after.is_none() || page_len == 0 {
                break;
            }
        }

        submissions.truncate(limit);
        tracing::debug!(subreddit, sort, count = submissions.len(), "collected Reddit listing");
        Ok(submissions)
    }
}
