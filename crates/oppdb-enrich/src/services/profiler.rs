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

const SYSTEM_PROMPT: &str = "You turn a forum post describing a problem into a minimal app \
concept. Propose at most three core functions. Reply with a JSON object with keys: \
problem_description, app_concept, core_functions (array of short strings), function_count \
(integer, equal to the length of core_functions), target_user, monetization_model.";

/// LLM-backed app-concept profiler.
///
/// When monetization evidence is available it is appended to the prompt and
/// recorded on the resulting profile.
#[derive(Debug)]
pub struct Profiler {
    llm: Arc<LlmClient>,
    stats: ServiceStats,
}

impl Profiler {
    #[must_use]
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            stats: ServiceStats::new(),
        }
    }

    async fn analyze(
        &self,
        submission: &Submission,
        evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError> {
        let mut prompt = submission_prompt(submission);
        if let Some(evidence) = evidence {
            prompt.push_str("\n\n");
            prompt.push_str(&evidence.to_prompt_context());
        }

        let raw = self
            .llm
            .complete_json(self.kind(), SYSTEM_PROMPT, &prompt)
            .await?;
        let profile = normalize::profile(&raw)?.with_evidence(evidence);

        if let Some(issue) = &profile.integrity {
            tracing::warn!(submission = %submission.id, error = %issue, "profile needs review");
        }
        Ok(AnalysisOutcome::Profile(profile))
    }
}

#[async_trait]
impl AnalysisService for Profiler {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Profiler
    }

    async fn enrich(
        &self,
        submission: &Submission,
        evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError> {
        let started = Instant::now();
        let result = self.analyze(submission, evidence).await;
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
