use oppdb_enrich::EnrichmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("Reddit API returned status {status} for {endpoint}")]
    Api { status: u16, endpoint: String },

    #[error("Reddit response parse error: {0}")]
    Parse(String),
}

impl From<RedditError> for EnrichmentError {
    fn from(e: RedditError) -> Self {
        EnrichmentError::Source(format!("reddit: {e}"))
    }
}
