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

const SYSTEM_PROMPT: &str = "You validate the market for the product need described in a \
forum post. Reply with a JSON object with keys: validation_score (0-100), competitors (array \
of existing products that address the need), market_size_estimate (short string), reasoning \
(two sentences at most).";

/// LLM-backed market validation.
#[derive(Debug)]
pub struct MarketValidator {
    llm: Arc<LlmClient>,
    stats: ServiceStats,
}

impl MarketValidator {
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
        Ok(AnalysisOutcome::Market(normalize::market(&raw)?))
    }
}

#[async_trait]
impl AnalysisService for MarketValidator {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::MarketValidation
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
