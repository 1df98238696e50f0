//! Read access to `concept_submissions` and `concept_analyses`.

use std::collections::HashMap;

use async_trait::async_trait;
use oppdb_core::ResolvedConcept;
use oppdb_enrich::{AnalysisKind, ConceptStore, EnrichmentError};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A submission linked to a concept, with the analysis kinds already stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ConceptLinkRow {
    pub submission_id: String,
    pub concept_id: i64,
    pub has_monetization: bool,
    pub has_profile: bool,
}

impl From<&ConceptLinkRow> for ResolvedConcept {
    fn from(row: &ConceptLinkRow) -> Self {
        ResolvedConcept {
            concept_id: row.concept_id,
            has_monetization: row.has_monetization,
            has_profile: row.has_profile,
        }
    }
}

/// Resolve many submissions to concepts in one query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lookup_concept_links(
    pool: &PgPool,
    submission_ids: &[String],
) -> Result<Vec<ConceptLinkRow>, DbError> {
    let rows = sqlx::query_as::<_, ConceptLinkRow>(
        "SELECT cs.submission_id, cs.concept_id, \
                EXISTS (SELECT 1 FROM concept_analyses a \
                        WHERE a.concept_id = cs.concept_id AND a.kind = $2) AS has_monetization, \
                EXISTS (SELECT 1 FROM concept_analyses a \
                        WHERE a.concept_id = cs.concept_id AND a.kind = $3) AS has_profile \
         FROM concept_submissions cs \
         WHERE cs.submission_id = ANY($1)",
    )
    .bind(submission_ids)
    .bind(AnalysisKind::Monetization.name())
    .bind(AnalysisKind::Profiler.name())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Stored payload of the `kind` analysis for a concept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_prior_analysis(
    pool: &PgPool,
    concept_id: i64,
    kind: AnalysisKind,
) -> Result<Option<Value>, DbError> {
    let payload = sqlx::query_scalar::<_, Value>(
        "SELECT payload FROM concept_analyses WHERE concept_id = $1 AND kind = $2",
    )
    .bind(concept_id)
    .bind(kind.name())
    .fetch_optional(pool)
    .await?;
    Ok(payload)
}

/// [`ConceptStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgConceptStore {
    pool: PgPool,
}

impl PgConceptStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConceptStore for PgConceptStore {
    async fn lookup_concepts(
        &self,
        submission_ids: &[String],
    ) -> Result<HashMap<String, ResolvedConcept>, EnrichmentError> {
        let rows = lookup_concept_links(&self.pool, submission_ids)
            .await
            .map_err(|e| EnrichmentError::ConceptStore(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| (row.submission_id.clone(), ResolvedConcept::from(row)))
            .collect())
    }

    async fn prior_analysis(
        &self,
        concept_id: i64,
        kind: AnalysisKind,
    ) -> Result<Option<Value>, EnrichmentError> {
        get_prior_analysis(&self.pool, concept_id, kind)
            .await
            .map_err(|e| EnrichmentError::ConceptStore(e.to_string()))
    }
}
