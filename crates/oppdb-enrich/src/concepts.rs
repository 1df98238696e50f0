//! Business-concept lookup for evidence reuse.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oppdb_core::{ResolvedConcept, Submission};
use serde_json::Value;

use crate::error::EnrichmentError;
use crate::types::AnalysisKind;

/// Read access to known business concepts and their stored analyses.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Resolve many submission ids in one round trip.
    ///
    /// Ids with no linked concept are absent from the returned map.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::ConceptStore`] when the store is unreachable.
    async fn lookup_concepts(
        &self,
        submission_ids: &[String],
    ) -> Result<HashMap<String, ResolvedConcept>, EnrichmentError>;

    /// Raw payload of the stored analysis of `kind` for a concept, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::ConceptStore`] when the store is unreachable.
    async fn prior_analysis(
        &self,
        concept_id: i64,
        kind: AnalysisKind,
    ) -> Result<Option<Value>, EnrichmentError>;
}

/// Batch resolver in front of a [`ConceptStore`].
#[derive(Clone)]
pub struct ConceptResolver {
    store: Arc<dyn ConceptStore>,
}

impl ConceptResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ConceptStore>) -> Self {
        Self { store }
    }

    /// One bulk lookup for the whole batch.
    ///
    /// A failed lookup is logged and treated as "no concepts known", which
    /// sends every submission to full analysis.
    pub async fn resolve(&self, batch: &[Submission]) -> HashMap<String, ResolvedConcept> {
        if batch.is_empty() {
            return HashMap::new();
        }
        let ids: Vec<String> = batch.iter().map(|s| s.id.clone()).collect();
        match self.store.lookup_concepts(&ids).await {
            Ok(found) => {
                tracing::debug!(requested = ids.len(), resolved = found.len(), "concept lookup");
                found
            }
            Err(e) => {
                tracing::warn!(error = %e, "concept lookup failed; analyzing batch without reuse");
                HashMap::new()
            }
        }
    }
}
