//! In-memory collaborators for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use oppdb_core::{ResolvedConcept, Submission};
use serde_json::Value;

use crate::concepts::ConceptStore;
use crate::error::EnrichmentError;
use crate::source::{Source, SourceQuery};
use crate::storage::{MergedRecord, Sink, SinkOutcome, StorageShape};
use crate::types::AnalysisKind;

/// Serves a fixed list of submissions.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    submissions: Vec<Submission>,
}

impl InMemorySource {
    #[must_use]
    pub fn new(submissions: Vec<Submission>) -> Self {
        Self { submissions }
    }
}

#[async_trait]
impl Source for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Submission>, EnrichmentError> {
        let wanted: HashSet<String> = query
            .subreddits
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        Ok(self
            .submissions
            .iter()
            .filter(|s| wanted.is_empty() || wanted.contains(&s.subreddit.to_ascii_lowercase()))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConceptStore {
    concepts: HashMap<String, ResolvedConcept>,
    analyses: HashMap<(i64, AnalysisKind), Value>,
}

impl InMemoryConceptStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `submission_id` to `concept_id`. Flags are derived from the
    /// analyses stored for the concept at lookup time.
    #[must_use]
    pub fn with_link(mut self, submission_id: &str, concept_id: i64) -> Self {
        self.concepts.insert(
            submission_id.to_string(),
            ResolvedConcept {
                concept_id,
                has_monetization: false,
                has_profile: false,
            },
        );
        self
    }

    #[must_use]
    pub fn with_analysis(mut self, concept_id: i64, kind: AnalysisKind, payload: Value) -> Self {
        self.analyses.insert((concept_id, kind), payload);
        self
    }
}

#[async_trait]
impl ConceptStore for InMemoryConceptStore {
    async fn lookup_concepts(
        &self,
        submission_ids: &[String],
    ) -> Result<HashMap<String, ResolvedConcept>, EnrichmentError> {
        Ok(submission_ids
            .iter()
            .filter_map(|id| {
                let link = self.concepts.get(id)?;
                let has = |kind: AnalysisKind| self.analyses.contains_key(&(link.concept_id, kind));
                Some((
                    id.clone(),
                    ResolvedConcept {
                        concept_id: link.concept_id,
                        has_monetization: has(AnalysisKind::Monetization),
                        has_profile: has(AnalysisKind::Profiler),
                    },
                ))
            })
            .collect())
    }

    async fn prior_analysis(
        &self,
        concept_id: i64,
        kind: AnalysisKind,
    ) -> Result<Option<Value>, EnrichmentError> {
        Ok(self.analyses.get(&(concept_id, kind)).cloned())
    }
}

/// Keeps every stored record; a repeated submission id is a duplicate.
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: Mutex<Vec<(StorageShape, MergedRecord)>>,
}

impl InMemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<(StorageShape, MergedRecord)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn store(
        &self,
        record: &MergedRecord,
        shape: StorageShape,
    ) -> Result<SinkOutcome, EnrichmentError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records
            .iter()
            .any(|(_, r)| r.submission_id == record.submission_id)
        {
            return Ok(SinkOutcome::Duplicate);
        }
        records.push((shape, record.clone()));
        Ok(SinkOutcome::Stored)
    }
}

/// Accepts and discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSink;

#[async_trait]
impl Sink for DryRunSink {
    async fn store(
        &self,
        record: &MergedRecord,
        shape: StorageShape,
    ) -> Result<SinkOutcome, EnrichmentError> {
        tracing::debug!(submission = %record.submission_id, shape = shape.as_str(), "discarding record");
        Ok(SinkOutcome::Stored)
    }
}
