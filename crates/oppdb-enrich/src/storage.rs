//! Routing merged records to the persistence sink.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::EnrichmentError;
use crate::types::{AnalysisKind, EnrichmentResult};

/// Everything produced for one submission, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub submission_id: String,
    pub subreddit: String,
    pub title: String,
    pub concept_id: Option<i64>,
    /// Kinds whose fields were copied from a prior analysis.
    pub copied_kinds: Vec<AnalysisKind>,
    pub needs_review: bool,
    pub integrity_issues: Vec<String>,
    pub fields: EnrichmentResult,
}

/// Record shape the sink is asked to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageShape {
    /// Opportunity scores only.
    Score,
    /// Profile fields, with any scores alongside.
    CombinedProfile,
}

impl StorageShape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StorageShape::Score => "score",
            StorageShape::CombinedProfile => "combined_profile",
        }
    }
}

/// Records carrying a real profile go to the combined shape.
///
/// An inert profiler only leaves a status marker behind; that is not a
/// profile.
#[must_use]
pub fn route(record: &MergedRecord) -> StorageShape {
    if has_profile_content(&record.fields) {
        StorageShape::CombinedProfile
    } else {
        StorageShape::Score
    }
}

fn has_profile_content(fields: &EnrichmentResult) -> bool {
    let profile = AnalysisKind::Profiler;
    let non_empty_text = |field: &str| {
        fields
            .get(profile, field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    let has_functions = fields
        .get(profile, "core_functions")
        .and_then(Value::as_array)
        .is_some_and(|functions| !functions.is_empty());
    non_empty_text("app_concept") || non_empty_text("problem_description") || has_functions
}

/// What the sink did with a record it was able to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Stored,
    Duplicate,
    Rejected(String),
}

/// Destination for merged records.
///
/// `Err` is reserved for the sink itself being unavailable; per-record
/// refusals are [`SinkOutcome`] values.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn store(
        &self,
        record: &MergedRecord,
        shape: StorageShape,
    ) -> Result<SinkOutcome, EnrichmentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    DryRun,
    Duplicate,
    Rejected(String),
}

impl WriteOutcome {
    /// Dry runs count as stored so summaries match a real run.
    #[must_use]
    pub fn counts_as_stored(&self) -> bool {
        matches!(self, WriteOutcome::Stored | WriteOutcome::DryRun)
    }
}

#[derive(Clone)]
pub struct StorageRouter {
    sink: Arc<dyn Sink>,
    dry_run: bool,
}

impl StorageRouter {
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>, dry_run: bool) -> Self {
        Self { sink, dry_run }
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Route `record` and write it unless this is a dry run.
    ///
    /// # Errors
    ///
    /// Propagates the sink's error when the sink is unavailable.
    pub async fn persist(&self, record: &MergedRecord) -> Result<WriteOutcome, EnrichmentError> {
        let shape = route(record);
        if self.dry_run {
            tracing::debug!(submission = %record.submission_id, shape = shape.as_str(), "dry run: skipping write");
            return Ok(WriteOutcome::DryRun);
        }

        let outcome = match self.sink.store(record, shape).await? {
            SinkOutcome::Stored => WriteOutcome::Stored,
            SinkOutcome::Duplicate => {
                tracing::warn!(submission = %record.submission_id, "record already stored");
                WriteOutcome::Duplicate
            }
            SinkOutcome::Rejected(reason) => {
                tracing::warn!(submission = %record.submission_id, reason = %reason, "sink rejected record");
                WriteOutcome::Rejected(reason)
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisOutcome;

    fn record(fields: EnrichmentResult) -> MergedRecord {
        MergedRecord {
            submission_id: "t3_store".to_string(),
            subreddit: "saas".to_string(),
            title: "title".to_string(),
            concept_id: None,
            copied_kinds: Vec::new(),
            needs_review: false,
            integrity_issues: Vec::new(),
            fields,
        }
    }

    #[test]
    fn profile_fields_route_to_combined_shape() {
        let mut fields = EnrichmentResult::new();
        fields.set(AnalysisKind::OpportunityScoring, "final_score", 71.0);
        assert_eq!(route(&record(fields.clone())), StorageShape::Score);

        fields.set(AnalysisKind::Profiler, "app_concept", "Shift swap board");
        assert_eq!(route(&record(fields)), StorageShape::CombinedProfile);
    }

    #[test]
    fn inert_profile_marker_routes_to_score_shape() {
        let mut fields = EnrichmentResult::new();
        fields.set(AnalysisKind::OpportunityScoring, "final_score", 64.0);
        fields.merge(AnalysisOutcome::Inert(AnalysisKind::Profiler).into_result());
        assert!(fields.has_family(AnalysisKind::Profiler));
        assert_eq!(route(&record(fields)), StorageShape::Score);
    }

    #[test]
    fn blank_profile_text_is_not_a_profile() {
        let mut fields = EnrichmentResult::new();
        fields.set(AnalysisKind::Profiler, "app_concept", "  ");
        fields.set(AnalysisKind::Profiler, "core_functions", serde_json::json!([]));
        assert_eq!(route(&record(fields.clone())), StorageShape::Score);

        fields.set_override(AnalysisKind::Profiler, "core_functions", serde_json::json!(["book slots"]));
        assert_eq!(route(&record(fields)), StorageShape::CombinedProfile);
    }

    #[test]
    fn dry_run_and_stored_count_as_stored() {
        assert!(WriteOutcome::Stored.counts_as_stored());
        assert!(WriteOutcome::DryRun.counts_as_stored());
        assert!(!WriteOutcome::Duplicate.counts_as_stored());
        assert!(!WriteOutcome::Rejected("bad".to_string()).counts_as_stored());
    }
}
