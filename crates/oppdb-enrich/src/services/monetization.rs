use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use oppdb_core::Submission;

use super::{submission_prompt, AnalysisService};
use crate::error::EnrichmentError;
use crate::llm::LlmClient;
use crate::normalize;
use crate::stats::{ServiceStats, ServiceStatsSnapshot};
use crate::types::{AnalysisKind, AnalysisOutcome, Evidence};

const SYSTEM_PROMPT: &str = "You assess whether the author of a forum post would pay for a \
software solution to the problem they describe. Reply with a JSON object with keys: \
willingness_to_pay_score (0-100), customer_segment (b2b, b2c or mixed), payment_sentiment \
(positive, neutral or negative), urgency_level (low, medium, high or critical), \
mentioned_price_points (array of strings quoted from the post), existing_payment_behavior \
(what they pay for today, or \"none\"), confidence (0-1).";

/// LLM-backed willingness-to-pay analysis.
#[derive(Debug)]
pub struct MonetizationAnalyzer {
    llm: Arc<LlmClient>,
    stats: ServiceStats,
}

impl MonetizationAnalyzer {
    #[must_use]
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            stats: ServiceStats::new(),
        }
    }

    async fn analyze(&self, submission: &Submission) -> Result<AnalysisOutcome, EnrichmentError> {
        let raw = self
            .llm
            .complete_json(self.kind(), SYSTEM_PROMPT, &submission_prompt(submission))
            .await?;
        Ok(AnalysisOutcome::Monetization(normalize::monetization(&raw)?))
    }
}

#[async_trait]
impl AnalysisService for MonetizationAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Monetization
    }

    async fn enrich(
        &self,
        submission: &Submission,
        _evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError> {
        let started = Instant::now();
        let result = self.analyze(submission).await;
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
