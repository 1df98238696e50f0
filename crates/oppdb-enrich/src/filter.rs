//! Pre-analysis quality gate.

use oppdb_core::{QualityFilterConfig, Submission};

/// Whether `submission` clears the configured thresholds.
///
/// Missing engagement metrics count as zero. A disabled filter passes
/// everything.
#[must_use]
pub fn passes_quality_filter(submission: &Submission, config: &QualityFilterConfig) -> bool {
    if !config.enabled {
        return true;
    }
    submission.score_or_zero() >= config.min_score
        && submission.comments_or_zero() >= config.min_comment_count
        && text_length(submission) >= config.min_text_length
}

fn text_length(submission: &Submission) -> usize {
    submission.title.trim().chars().count() + submission.body.trim().chars().count()
}

#[derive(Debug, Clone)]
pub struct QualityFilter {
    config: QualityFilterConfig,
}

impl QualityFilter {
    #[must_use]
    pub fn new(config: QualityFilterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn passes(&self, submission: &Submission) -> bool {
        passes_quality_filter(submission, &self.config)
    }

    /// Split a batch into `(passed, rejected)` preserving input order.
    #[must_use]
    pub fn partition(&self, batch: Vec<Submission>) -> (Vec<Submission>, Vec<Submission>) {
        batch.into_iter().partition(|s| self.passes(s))
    }
}
