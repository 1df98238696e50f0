use async_trait::async_trait;
use oppdb_core::{AppConfig, ConfigError, Submission};
use oppdb_enrich::{EnrichmentError, Source, SourceQuery};

use crate::client::{RedditClient, RedditCredentials, DEFAULT_API_BASE, DEFAULT_TOKEN_URL};

/// [`Source`] over subreddit listings.
///
/// A fresh token is obtained per fetch; runs are short and infrequent.
#[derive(Debug, Clone)]
pub struct RedditSource {
    credentials: RedditCredentials,
    subreddits: Vec<String>,
    token_url: String,
    api_base: String,
}

impl RedditSource {
    #[must_use]
    pub fn new(credentials: RedditCredentials, subreddits: Vec<String>) -> Self {
        Self {
            credentials,
            subreddits,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when Reddit credentials are not
    /// configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            RedditCredentials::from_app_config(config)?,
            config.pipeline.subreddits.clone(),
        ))
    }

    #[must_use]
    pub fn with_base_url(mut self, token_url: &str, api_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.to_string();
        self
    }
}

#[async_trait]
impl Source for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Submission>, EnrichmentError> {
        let subreddits = if query.subreddits.is_empty() {
            &self.subreddits
        } else {
            &query.subreddits
        };
        if subreddits.is_empty() || query.limit == 0 {
            return Ok(Vec::new());
        }

        let client =
            RedditClient::connect_with_base_url(&self.credentials, &self.token_url, &self.api_base)
                .await?;

        // Spread the limit so the first subreddit cannot fill the whole batch.
        let per_subreddit = query.limit.div_ceil(subreddits.len());
        let mut batch = Vec::new();
        for subreddit in subreddits {
            let remaining = query.limit.saturating_sub(batch.len()).min(per_subreddit);
            if remaining == 0 {
                break;
            }
            let posts = client.listing(subreddit, &query.sort, remaining).await?;
            tracing::info!(subreddit = %subreddit, count = posts.len(), "fetched subreddit");
            batch.extend(posts);
        }
        Ok(batch)
    }
}
