//! Writes merged records to `scored_submissions` or `app_opportunities`.

use async_trait::async_trait;
use oppdb_enrich::{AnalysisKind, EnrichmentError, MergedRecord, Sink, SinkOutcome, StorageShape};
use serde_json::Value;
use sqlx::PgPool;

use crate::is_outage;

/// Columns shared by both shapes, lifted out of the record's field map.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreColumns {
    pub final_score: Option<f64>,
    pub priority: Option<String>,
    pub disqualified: bool,
    pub needs_review: bool,
    pub copied_kinds: Vec<String>,
}

impl ScoreColumns {
    #[must_use]
    pub fn from_record(record: &MergedRecord) -> Self {
        let opportunity = AnalysisKind::OpportunityScoring;
        Self {
            final_score: number(record, opportunity, "final_score"),
            priority: text(record, opportunity, "priority"),
            disqualified: flag(record, opportunity, "disqualified"),
            needs_review: record.needs_review,
            copied_kinds: record
                .copied_kinds
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
        }
    }
}

/// Profile-specific columns for the combined shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileColumns {
    pub problem_description: Option<String>,
    pub app_concept: Option<String>,
    pub core_functions: Value,
    pub function_count: Option<i32>,
    pub evidence_source: Option<String>,
}

impl ProfileColumns {
    #[must_use]
    pub fn from_record(record: &MergedRecord) -> Self {
        let profile = AnalysisKind::Profiler;
        Self {
            problem_description: text(record, profile, "problem_description"),
            app_concept: text(record, profile, "app_concept"),
            core_functions: record
                .fields
                .get(profile, "core_functions")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
            function_count: record
                .fields
                .get(profile, "function_count")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok()),
            evidence_source: text(record, profile, "evidence_source"),
        }
    }
}

fn number(record: &MergedRecord, kind: AnalysisKind, field: &str) -> Option<f64> {
    record.fields.get(kind, field).and_then(Value::as_f64)
}

fn text(record: &MergedRecord, kind: AnalysisKind, field: &str) -> Option<String> {
    record
        .fields
        .get(kind, field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn flag(record: &MergedRecord, kind: AnalysisKind, field: &str) -> bool {
    record
        .fields
        .get(kind, field)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// [`Sink`] backed by Postgres.
///
/// Inserts use `ON CONFLICT DO NOTHING`; a conflict is reported as
/// [`SinkOutcome::Duplicate`]. Statement-level failures (constraint
/// violations) are [`SinkOutcome::Rejected`]; connectivity failures are
/// returned as [`EnrichmentError::Sink`] and end the run.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_score(&self, record: &MergedRecord) -> Result<u64, sqlx::Error> {
        let score = ScoreColumns::from_record(record);
        let result = sqlx::query(
            "INSERT INTO scored_submissions \
                 (submission_id, subreddit, title, concept_id, final_score, priority, \
                  disqualified, needs_review, copied_kinds, fields) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (submission_id) DO NOTHING",
        )
        .bind(&record.submission_id)
        .bind(&record.subreddit)
        .bind(&record.title)
        .bind(record.concept_id)
        .bind(score.final_score)
        .bind(score.priority)
        .bind(score.disqualified)
        .bind(score.needs_review)
        .bind(score.copied_kinds)
        .bind(record.fields.clone().into_value())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_profile(&self, record: &MergedRecord) -> Result<u64, sqlx::Error> {
        let score = ScoreColumns::from_record(record);
        let profile = ProfileColumns::from_record(record);
        let result = sqlx::query(
            "INSERT INTO app_opportunities \
                 (submission_id, subreddit, title, concept_id, problem_description, app_concept, \
                  core_functions, function_count, evidence_source, final_score, priority, \
                  disqualified, needs_review, copied_kinds, fields) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (submission_id) DO NOTHING",
        )
        .bind(&record.submission_id)
        .bind(&record.subreddit)
        .bind(&record.title)
        .bind(record.concept_id)
        .bind(profile.problem_description)
        .bind(profile.app_concept)
        .bind(profile.core_functions)
        .bind(profile.function_count)
        .bind(profile.evidence_source)
        .bind(score.final_score)
        .bind(score.priority)
        .bind(score.disqualified)
        .bind(score.needs_review)
        .bind(score.copied_kinds)
        .bind(record.fields.clone().into_value())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Sink for PgSink {
    async fn store(
        &self,
        record: &MergedRecord,
        shape: StorageShape,
    ) -> Result<SinkOutcome, EnrichmentError> {
        let inserted = match shape {
            StorageShape::Score => self.insert_score(record).await,
            StorageShape::CombinedProfile => self.insert_profile(record).await,
        };

        match inserted {
            Ok(0) => Ok(SinkOutcome::Duplicate),
            Ok(_) => Ok(SinkOutcome::Stored),
            Err(e) if is_outage(&e) => Err(EnrichmentError::Sink(e.to_string())),
            Err(e) => Ok(SinkOutcome::Rejected(e.to_string())),
        }
    }
}
