use std::time::Instant;

use async_trait::async_trait;
use oppdb_core::Submission;

use super::AnalysisService;
use crate::error::EnrichmentError;
use crate::stats::{ServiceStats, ServiceStatsSnapshot};
use crate::types::{AnalysisKind, AnalysisOutcome, Evidence, TrustBadge, TrustValidation};

const UPVOTE_CAP: f64 = 1_000.0;
const COMMENT_CAP: f64 = 200.0;
const UPVOTE_WEIGHT: f64 = 0.6;
const COMMENT_WEIGHT: f64 = 0.4;
const ENGAGEMENT_WEIGHT: f64 = 0.6;
const TEXT_WEIGHT: f64 = 0.4;
const CHARS_PER_POINT: f64 = 5.0;
const REMOVED_BODY_PENALTY: f64 = 50.0;

/// Deterministic credibility score from engagement and text substance.
///
/// Needs no network access, so it never fails.
#[derive(Debug, Default)]
pub struct TrustValidator {
    stats: ServiceStats,
}

impl TrustValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn validate(submission: &Submission) -> TrustValidation {
        let engagement_score = engagement_score(submission);
        let text_quality_score = text_quality_score(submission);
        let trust_score = round2(
            ENGAGEMENT_WEIGHT * engagement_score + TEXT_WEIGHT * text_quality_score,
        );
        TrustValidation {
            trust_score,
            badge: TrustBadge::from_score(trust_score),
            engagement_score,
            text_quality_score,
        }
    }
}

/// Log-scaled so the first hundred upvotes matter more than the next thousand.
fn log_share(value: i64, cap: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let v = value.max(0) as f64;
    ((v.min(cap) + 1.0).ln() / (cap + 1.0).ln()) * 100.0
}

fn engagement_score(submission: &Submission) -> f64 {
    round2(
        UPVOTE_WEIGHT * log_share(submission.score_or_zero(), UPVOTE_CAP)
            + COMMENT_WEIGHT * log_share(submission.comments_or_zero(), COMMENT_CAP),
    )
}

fn text_quality_score(submission: &Submission) -> f64 {
    let body = submission.body.trim();
    let removed = matches!(body, "[deleted]" | "[removed]");
    let chars = if removed {
        submission.title.trim().chars().count()
    } else {
        submission.full_text().trim().chars().count()
    };

    #[allow(clippy::cast_precision_loss)]
    let mut score = (chars as f64 / CHARS_PER_POINT).min(100.0);
    if removed {
        score = (score - REMOVED_BODY_PENALTY).max(0.0);
    }
    round2(score)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait]
impl AnalysisService for TrustValidator {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Trust
    }

    async fn enrich(
        &self,
        submission: &Submission,
        _evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError> {
        let started = Instant::now();
        let result = Ok(AnalysisOutcome::Trust(Self::validate(submission)));
        self.stats.observe(started, &result);
        result
    }

    fn statistics(&self) -> ServiceStatsSnapshot {
        self.stats.snapshot()
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(score: i64, comments: i64, body: &str) -> Submission {
        Submission {
            id: "t3_trust".to_string(),
            title: "Tracking invoices for a two-person agency".to_string(),
            body: body.to_string(),
            subreddit: "freelance".to_string(),
            score: Some(score),
            num_comments: Some(comments),
            author: None,
            url: None,
            created_utc: None,
        }
    }

    #[test]
    fn capped_engagement_and_long_text_reach_high_badge() {
        let v = TrustValidator::validate(&submission(5_000, 900, &"x".repeat(600)));
        assert!((v.engagement_score - 100.0).abs() < 1e-9);
        assert!((v.text_quality_score - 100.0).abs() < 1e-9);
        assert!((v.trust_score - 100.0).abs() < 1e-9);
        assert_eq!(v.badge, TrustBadge::High);
    }

    #[test]
    fn zero_engagement_scores_zero_engagement() {
        let v = TrustValidator::validate(&submission(0, 0, ""));
        assert!(v.engagement_score.abs() < 1e-9);
        assert_eq!(v.badge, TrustBadge::Unverified);
    }

    #[test]
    fn removed_body_is_penalized() {
        let kept = TrustValidator::validate(&submission(50, 10, "We lose about an hour a day."));
        let removed = TrustValidator::validate(&submission(50, 10, "[removed]"));
        assert!(removed.text_quality_score < kept.text_quality_score);
        assert!(removed.trust_score < kept.trust_score);
    }

    #[test]
    fn more_engagement_never_lowers_trust() {
        let low = TrustValidator::validate(&submission(3, 1, "same body"));
        let high = TrustValidator::validate(&submission(300, 40, "same body"));
        assert!(high.trust_score >= low.trust_score);
    }

    #[tokio::test]
    async fn enrich_records_stats() {
        let validator = TrustValidator::new();
        let outcome = validator
            .enrich(&submission(10, 5, "body"), None)
            .await
            .unwrap();
        assert_eq!(outcome.kind(), AnalysisKind::Trust);
        assert_eq!(validator.statistics().succeeded, 1);
        validator.reset_statistics();
        assert_eq!(validator.statistics().calls, 0);
    }
}
