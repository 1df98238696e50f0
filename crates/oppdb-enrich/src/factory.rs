//! Builds the set of enabled analysis services from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use oppdb_core::{AppConfig, ServiceToggles};

use crate::error::EnrichmentError;
use crate::llm::LlmClient;
use crate::scorer::OpportunityScorer;
use crate::services::{
    AnalysisService, InertService, MarketValidator, MonetizationAnalyzer, OpportunityAnalyzer,
    Profiler, TrustValidator,
};
use crate::stats::ServiceStatsSnapshot;
use crate::types::AnalysisKind;

/// One service per enabled [`AnalysisKind`].
///
/// Construction of each service is isolated: a kind whose service cannot be
/// built gets an [`InertService`] instead, and the rest are unaffected.
#[derive(Clone, Default)]
pub struct ServiceFactory {
    services: BTreeMap<AnalysisKind, Arc<dyn AnalysisService>>,
}

impl std::fmt::Debug for ServiceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFactory")
            .field("enabled", &self.enabled_kinds())
            .field("fallback", &self.fallback_kinds())
            .finish()
    }
}

impl ServiceFactory {
    /// Build production services.
    ///
    /// The LLM client is built once and shared. If it cannot be built (for
    /// example no API key) every LLM-backed kind falls back to inert; the
    /// trust validator needs no client and is unaffected.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let llm = LlmClient::from_app_config(config)
            .map(Arc::new)
            .map_err(|e| e.to_string());
        let scorer = OpportunityScorer::new(config.pipeline.weights);
        Self::build_with(&config.pipeline.services, |kind| {
            let llm = llm.clone().map_err(|reason| EnrichmentError::Unavailable { kind, reason })?;
            Ok(production_service(kind, llm, scorer))
        })
    }

    /// Build every enabled kind with a working LLM client.
    #[must_use]
    pub fn with_llm(toggles: &ServiceToggles, llm: Arc<LlmClient>, scorer: OpportunityScorer) -> Self {
        Self::build_with(toggles, |kind| Ok(production_service(kind, llm.clone(), scorer)))
    }

    /// Build every enabled kind with `build`, substituting an inert service
    /// for any kind whose construction fails.
    pub fn build_with<F>(toggles: &ServiceToggles, mut build: F) -> Self
    where
        F: FnMut(AnalysisKind) -> Result<Arc<dyn AnalysisService>, EnrichmentError>,
    {
        let mut services: BTreeMap<AnalysisKind, Arc<dyn AnalysisService>> = BTreeMap::new();
        for kind in AnalysisKind::enabled(toggles) {
            let service = match build(kind) {
                Ok(service) => service,
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "service construction failed; using inert fallback");
                    Arc::new(InertService::new(kind))
                }
            };
            services.insert(kind, service);
        }
        tracing::info!(count = services.len(), "analysis services ready");
        Self { services }
    }

    /// Assemble from prebuilt services, keyed by each service's own kind.
    #[must_use]
    pub fn from_services(services: impl IntoIterator<Item = Arc<dyn AnalysisService>>) -> Self {
        Self {
            services: services.into_iter().map(|s| (s.kind(), s)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, kind: AnalysisKind) -> Option<&Arc<dyn AnalysisService>> {
        self.services.get(&kind)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<dyn AnalysisService>> {
        name.parse::<AnalysisKind>()
            .ok()
            .and_then(|kind| self.get(kind))
    }

    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Enabled kinds in processing order.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<AnalysisKind> {
        self.services.keys().copied().collect()
    }

    /// Kinds served by the inert fallback.
    #[must_use]
    pub fn fallback_kinds(&self) -> Vec<AnalysisKind> {
        self.services
            .iter()
            .filter(|(_, s)| s.is_inert())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Services in processing order.
    pub fn iter(&self) -> impl Iterator<Item = (AnalysisKind, &Arc<dyn AnalysisService>)> {
        self.services.iter().map(|(kind, s)| (*kind, s))
    }

    /// Per-service counters keyed by service name.
    #[must_use]
    pub fn all_statistics(&self) -> BTreeMap<String, ServiceStatsSnapshot> {
        self.services
            .iter()
            .map(|(kind, s)| (kind.name().to_string(), s.statistics()))
            .collect()
    }

    pub fn reset_all_statistics(&self) {
        for service in self.services.values() {
            service.reset_statistics();
        }
    }
}

fn production_service(
    kind: AnalysisKind,
    llm: Arc<LlmClient>,
    scorer: OpportunityScorer,
) -> Arc<dyn AnalysisService> {
    match kind {
        AnalysisKind::Monetization => Arc::new(MonetizationAnalyzer::new(llm)),
        AnalysisKind::Profiler => Arc::new(Profiler::new(llm)),
        AnalysisKind::OpportunityScoring => Arc::new(OpportunityAnalyzer::new(llm, scorer)),
        AnalysisKind::Trust => Arc::new(TrustValidator::new()),
        AnalysisKind::MarketValidation => Arc::new(MarketValidator::new(llm)),
    }
}
