use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use oppdb_core::Submission;

use super::{submission_prompt, AnalysisService};
use crate::error::EnrichmentError;
use crate::llm::LlmClient;
use crate::normalize;
use crate::scorer::OpportunityScorer;
use crate::stats::{ServiceStats, ServiceStatsSnapshot};
use crate::types::{AnalysisKind, AnalysisOutcome, Evidence};

const SYSTEM_PROMPT: &str = "You rate a business opportunity described in a forum post. \
Score each dimension from 0 to 100. Reply with a JSON object with keys: market_demand, \
pain_intensity, monetization_potential, market_gap, technical_feasibility, core_functions \
(array of the smallest set of functions an app would need), function_count.";

/// Opportunity scoring: LLM dimension ratings fed through [`OpportunityScorer`].
#[derive(Debug)]
pub struct OpportunityAnalyzer {
    llm: Arc<LlmClient>,
    scorer: OpportunityScorer,
    stats: ServiceStats,
}

impl OpportunityAnalyzer {
    #[must_use]
    pub fn new(llm: Arc<LlmClient>, scorer: OpportunityScorer) -> Self {
        Self {
            llm,
            scorer,
            stats: ServiceStats::new(),
        }
    }

    async fn analyze(&self, submission: &Submission) -> Result<AnalysisOutcome, EnrichmentError> {
        let raw = self
            .llm
            .complete_json(self.kind(), SYSTEM_PROMPT, &submission_prompt(submission))
            .await?;
        let inputs = normalize::opportunity(&raw)?;
        let assessment =
            self.scorer
                .assess(inputs.dimensions, &inputs.core_functions, inputs.declared_count);

        tracing::debug!(
            submission = %submission.id,
            final_score = assessment.final_score,
            priority = assessment.priority.label(),
            disqualified = assessment.disqualified(),
            "opportunity scored"
        );
        if let Some(issue) = &assessment.integrity {
            tracing::warn!(submission = %submission.id, error = %issue, "opportunity needs review");
        }
        Ok(AnalysisOutcome::Opportunity(assessment))
    }
}

#[async_trait]
impl AnalysisService for OpportunityAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::OpportunityScoring
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
