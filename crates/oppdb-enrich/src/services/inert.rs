use std::time::Instant;

use async_trait::async_trait;
use oppdb_core::Submission;

use super::AnalysisService;
use crate::error::EnrichmentError;
use crate::stats::{ServiceStats, ServiceStatsSnapshot};
use crate::types::{AnalysisKind, AnalysisOutcome, Evidence};

/// No-op stand-in for a service whose construction failed.
///
/// Always succeeds with [`AnalysisOutcome::Inert`] so the remaining analyses
/// for the submission still run.
#[derive(Debug)]
pub struct InertService {
    kind: AnalysisKind,
    stats: ServiceStats,
}

impl InertService {
    #[must_use]
    pub fn new(kind: AnalysisKind) -> Self {
        Self {
            kind,
            stats: ServiceStats::new(),
        }
    }
}

#[async_trait]
impl AnalysisService for InertService {
    fn kind(&self) -> AnalysisKind {
        self.kind
    }

    fn is_inert(&self) -> bool {
        true
    }

    async fn enrich(
        &self,
        _submission: &Submission,
        _evidence: Option<&Evidence>,
    ) -> Result<AnalysisOutcome, EnrichmentError> {
        let result = Ok(AnalysisOutcome::Inert(self.kind));
        self.stats.observe(Instant::now(), &result);
        result
    }

    fn statistics(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            inert: true,
            ..self.stats.snapshot()
        }
    }

    fn reset_statistics(&self) {
        self.stats.reset();
    }
}
