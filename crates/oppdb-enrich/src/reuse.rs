//! Evidence reuse: copy prior analyses of a known business concept instead of
//! paying for them again.
//!
//! Copies run in a fixed order. Monetization goes first and its verdict is
//! handed to the profile copy as [`Evidence`], so a copied profile always
//! states which monetization verdict it was paired with.

use std::sync::Arc;

use oppdb_core::{ResolvedConcept, ReuseConfig, ServiceToggles, Submission};

use crate::concepts::ConceptStore;
use crate::error::EnrichmentError;
use crate::normalize;
use crate::types::{
    AnalysisKind, AnalysisOutcome, EnrichmentResult, Evidence, EvidenceSource,
    MonetizationAnalysis, ProfileAnalysis,
};

/// Partial record assembled from copied analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct ReusedEnrichment {
    pub result: EnrichmentResult,
    /// Kinds copied successfully, in copy order.
    pub copied: Vec<AnalysisKind>,
    /// Kinds whose copy was attempted and failed; these still need a fresh run.
    pub failed: Vec<AnalysisKind>,
    /// Monetization evidence, when monetization was copied.
    pub evidence: Option<Evidence>,
    pub needs_review: bool,
    pub integrity_issues: Vec<String>,
}

#[derive(Clone)]
pub struct EvidenceReuseEngine {
    store: Arc<dyn ConceptStore>,
    reuse: ReuseConfig,
    services: ServiceToggles,
}

impl EvidenceReuseEngine {
    #[must_use]
    pub fn new(store: Arc<dyn ConceptStore>, reuse: ReuseConfig, services: ServiceToggles) -> Self {
        Self {
            store,
            reuse,
            services,
        }
    }

    /// Kinds worth attempting for `concept`, in copy order.
    #[must_use]
    pub fn reusable_kinds(&self, concept: &ResolvedConcept) -> Vec<AnalysisKind> {
        if !self.reuse.enabled {
            return Vec::new();
        }
        let mut kinds = Vec::with_capacity(2);
        if self.reuse.monetization && self.services.monetization && concept.has_monetization {
            kinds.push(AnalysisKind::Monetization);
        }
        if self.reuse.profile && self.services.profiler && concept.has_profile {
            kinds.push(AnalysisKind::Profiler);
        }
        kinds
    }

    /// Copy whatever prior analyses `concept` has.
    ///
    /// Returns `None` when nothing could be copied; the caller then analyzes
    /// the submission from scratch. Read-only.
    pub async fn attempt(
        &self,
        submission: &Submission,
        concept: &ResolvedConcept,
    ) -> Option<ReusedEnrichment> {
        let kinds = self.reusable_kinds(concept);
        if kinds.is_empty() {
            return None;
        }

        let mut reused = ReusedEnrichment {
            result: EnrichmentResult::new(),
            copied: Vec::new(),
            failed: Vec::new(),
            evidence: None,
            needs_review: false,
            integrity_issues: Vec::new(),
        };

        for kind in kinds {
            let outcome = match kind {
                AnalysisKind::Monetization => {
                    self.copy_monetization(concept.concept_id).await.map(|m| {
                        reused.evidence = Some(Evidence::from_monetization(
                            &m,
                            EvidenceSource::Copied(AnalysisKind::Monetization),
                        ));
                        AnalysisOutcome::Monetization(m)
                    })
                }
                AnalysisKind::Profiler => self
                    .copy_profile(concept.concept_id, reused.evidence.as_ref())
                    .await
                    .map(AnalysisOutcome::Profile),
                _ => continue,
            };

            match outcome {
                Ok(outcome) => {
                    if let Some(issue) = outcome.integrity() {
                        tracing::warn!(
                            submission = %submission.id,
                            concept_id = concept.concept_id,
                            error = %issue,
                            "copied analysis needs review"
                        );
                        reused.needs_review = true;
                        reused.integrity_issues.push(issue.to_string());
                    }
                    reused.result.merge(outcome.into_result());
                    reused.copied.push(kind);
                }
                Err(e) => {
                    tracing::warn!(
                        submission = %submission.id,
                        concept_id = concept.concept_id,
                        kind = %kind,
                        error = %e,
                        "copy failed; will analyze fresh"
                    );
                    reused.failed.push(kind);
                }
            }
        }

        if reused.copied.is_empty() {
            None
        } else {
            Some(reused)
        }
    }

    /// # Errors
    ///
    /// Returns [`EnrichmentError::Unavailable`] when the concept has no stored
    /// monetization analysis, or the store/normalization error.
    pub async fn copy_monetization(
        &self,
        concept_id: i64,
    ) -> Result<MonetizationAnalysis, EnrichmentError> {
        let raw = self.prior(concept_id, AnalysisKind::Monetization).await?;
        normalize::monetization(&raw)
    }

    /// Copy the stored profile, tagged with `evidence` (or `"none"`).
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::Unavailable`] when the concept has no stored
    /// profile, or the store/normalization error.
    pub async fn copy_profile(
        &self,
        concept_id: i64,
        evidence: Option<&Evidence>,
    ) -> Result<ProfileAnalysis, EnrichmentError> {
        let raw = self.prior(concept_id, AnalysisKind::Profiler).await?;
        Ok(normalize::profile(&raw)?.with_evidence(evidence))
    }

    async fn prior(
        &self,
        concept_id: i64,
        kind: AnalysisKind,
    ) -> Result<serde_json::Value, EnrichmentError> {
        self.store
            .prior_analysis(concept_id, kind)
            .await?
            .ok_or_else(|| EnrichmentError::Unavailable {
                kind,
                reason: format!("concept {concept_id} has no stored {kind} analysis"),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    #[derive(Default)]
    struct RecordingStore {
        payloads: HashMap<(i64, AnalysisKind), Value>,
        calls: Mutex<Vec<AnalysisKind>>,
    }

    impl RecordingStore {
        fn with(mut self, concept_id: i64, kind: AnalysisKind, payload: Value) -> Self {
            self.payloads.insert((concept_id, kind), payload);
            self
        }

        fn calls(&self) -> Vec<AnalysisKind> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConceptStore for RecordingStore {
        async fn lookup_concepts(
            &self,
            _submission_ids: &[String],
        ) -> Result<HashMap<String, ResolvedConcept>, EnrichmentError> {
            Ok(HashMap::new())
        }

        async fn prior_analysis(
            &self,
            concept_id: i64,
            kind: AnalysisKind,
        ) -> Result<Option<Value>, EnrichmentError> {
            self.calls.lock().unwrap().push(kind);
            Ok(self.payloads.get(&(concept_id, kind)).cloned())
        }
    }

    fn submission() -> Submission {
        Submission {
            id: "t3_reuse".to_string(),
            title: "Need a better way to chase unpaid invoices".to_string(),
            body: String::new(),
            subreddit: "freelance".to_string(),
            score: Some(20),
            num_comments: Some(8),
            author: None,
            url: None,
            created_utc: None,
        }
    }

    fn concept(has_monetization: bool, has_profile: bool) -> ResolvedConcept {
        ResolvedConcept {
            concept_id: 7,
            has_monetization,
            has_profile,
        }
    }

    fn monetization_payload() -> Value {
        json!({
            "willingness_to_pay_score": 68,
            "customer_segment": "b2b",
            "payment_sentiment": "positive",
            "urgency_level": "high",
            "mentioned_price_points": ["$15/mo"],
            "existing_payment_behavior": "pays a bookkeeper",
            "confidence": 0.7
        })
    }

    fn profile_payload() -> Value {
        json!({
            "problem_description": "Freelancers lose money to late invoices",
            "app_concept": "Invoice nudger",
            "core_functions": ["track invoices", "send reminders"],
            "function_count": 2,
            "target_user": "freelancers",
            "monetization_model": "subscription"
        })
    }

    fn engine(store: Arc<RecordingStore>) -> EvidenceReuseEngine {
        EvidenceReuseEngine::new(store, ReuseConfig::default(), ServiceToggles::default())
    }

    #[tokio::test]
    async fn monetization_copy_runs_before_profile_copy() {
        let store = Arc::new(
            RecordingStore::default()
                .with(7, AnalysisKind::Monetization, monetization_payload())
                .with(7, AnalysisKind::Profiler, profile_payload()),
        );
        let reused = engine(store.clone())
            .attempt(&submission(), &concept(true, true))
            .await
            .unwrap();

        assert_eq!(
            store.calls(),
            vec![AnalysisKind::Monetization, AnalysisKind::Profiler]
        );
        assert_eq!(
            reused.copied,
            vec![AnalysisKind::Monetization, AnalysisKind::Profiler]
        );
        assert_eq!(
            reused.result.get(AnalysisKind::Profiler, "evidence_source"),
            Some(&json!("copied_monetization"))
        );
        assert!(reused.failed.is_empty());
        assert!(!reused.needs_review);
    }

    #[tokio::test]
    async fn profile_without_usable_evidence_is_tagged_none() {
        let store = Arc::new(
            RecordingStore::default()
                .with(7, AnalysisKind::Monetization, json!({ "customer_segment": "b2c" }))
                .with(7, AnalysisKind::Profiler, profile_payload()),
        );
        let reused = engine(store)
            .attempt(&submission(), &concept(true, true))
            .await
            .unwrap();

        assert_eq!(reused.copied, vec![AnalysisKind::Profiler]);
        assert_eq!(reused.failed, vec![AnalysisKind::Monetization]);
        assert!(reused.evidence.is_none());
        assert_eq!(
            reused.result.get(AnalysisKind::Profiler, "evidence_source"),
            Some(&json!("none"))
        );
    }

    #[tokio::test]
    async fn all_copies_failing_returns_none() {
        let store = Arc::new(RecordingStore::default());
        let reused = engine(store.clone())
            .attempt(&submission(), &concept(true, true))
            .await;
        assert!(reused.is_none());
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn flags_and_toggles_limit_attempts() {
        let store = Arc::new(RecordingStore::default());
        let e = engine(store.clone());
        assert_eq!(
            e.reusable_kinds(&concept(false, true)),
            vec![AnalysisKind::Profiler]
        );

        let disabled = EvidenceReuseEngine::new(
            store.clone(),
            ReuseConfig {
                enabled: false,
                ..ReuseConfig::default()
            },
            ServiceToggles::default(),
        );
        assert!(disabled.reusable_kinds(&concept(true, true)).is_empty());
        assert!(disabled.attempt(&submission(), &concept(true, true)).await.is_none());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn copied_profile_count_mismatch_needs_review() {
        let mut payload = profile_payload();
        payload["function_count"] = json!(5);
        let store = Arc::new(RecordingStore::default().with(7, AnalysisKind::Profiler, payload));
        let reused = engine(store)
            .attempt(&submission(), &concept(false, true))
            .await
            .unwrap();
        assert!(reused.needs_review);
        assert_eq!(reused.integrity_issues.len(), 1);
        assert_eq!(
            reused.result.get(AnalysisKind::Profiler, "needs_review"),
            Some(&json!(true))
        );
    }
}
