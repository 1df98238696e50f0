//! Analysis services the orchestrator invokes per submission.

mod inert;
mod market;
mod monetization;
mod opportunity;
mod profiler;
mod trust;

use async_trait::async_trait;
use oppdb_core::Submission;

use crate::error::EnrichmentError;
use crate::stats::ServiceStatsSnapshot;
use crate::types::{AnalysisKind, AnalysisOutcome, Evidence};

pub use inert::InertService;
pub use market::MarketValidator;
pub use monetization::MonetizationAnalyzer;
pub use opportunity::OpportunityAnalyzer;
pub use profiler::Profiler;
pub use trust::TrustValidator;

/// One kind of analysis over a single submission.
///
/// `evidence` carries the monetization verdict for the same submission when
/// one is available; services that do not use it ignore it.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    fn kind(&self) -> AnalysisKind;

    /// `true` for the stand-in built when the real service could not be.
    fn is_inert(&self) -> bool {
        false
    }

    async fn enrich(
        &self,
        submission: &Submission,
        evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError>;

    fn statistics(&self) -> ServiceStatsSnapshot;

    fn reset_statistics(&self);
}

/// User message shared by the LLM-backed services.
pub(crate) fn submission_prompt(submission: &Submission) -> String {
    format!(
        "Subreddit: r/{}\nUpvotes: {}\nComments: {}\n\n{}",
        submission.subreddit,
        submission.score_or_zero(),
        submission.comments_or_zero(),
        submission.full_text()
    )
}
