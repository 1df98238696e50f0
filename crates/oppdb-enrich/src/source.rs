//! Upstream submission source.

use async_trait::async_trait;
use oppdb_core::Submission;

use crate::error::EnrichmentError;

/// Listing sort used when a source supports more than one.
pub const DEFAULT_SORT: &str = "new";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    /// Maximum number of submissions to return across all subreddits.
    pub limit: usize,
    /// Empty means "whatever the source is configured for".
    pub subreddits: Vec<String>,
    pub sort: String,
}

impl SourceQuery {
    #[must_use]
    pub fn new(limit: usize, subreddits: Vec<String>) -> Self {
        Self {
            limit,
            subreddits,
            sort: DEFAULT_SORT.to_string(),
        }
    }
}

/// A batch-oriented provider of submissions.
///
/// Returns a whole batch rather than a stream: batches are bounded by
/// `limit` and the quality filter needs the batch size for its counters.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns [`EnrichmentError::Source`] when the upstream cannot be read.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Submission>, EnrichmentError>;
}
