//! The enrichment control loop.
//!
//! Per submission: filter, resolve concept, reuse or analyze, persist. Each
//! submission ends in exactly one of the analyzed, copied, or error buckets;
//! a failure in one submission never stops the batch. Only a source failure,
//! a sink outage, cancellation, or the deadline ends a run early.
//!
//! The opportunity gate sees the profile's function count as well as its own,
//! whether the profile was copied or analyzed fresh.

use std::collections::{BTreeMap, HashMap};
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use oppdb_core::{PipelineConfig, ResolvedConcept, Submission};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::concepts::{ConceptResolver, ConceptStore};
use crate::error::EnrichmentError;
use crate::factory::ServiceFactory;
use crate::filter::QualityFilter;
use crate::reuse::EvidenceReuseEngine;
use crate::source::{Source, SourceQuery};
use crate::stats::{PipelineStats, RunSummary, ServiceStatsSnapshot, StatsSnapshot};
use crate::storage::{MergedRecord, Sink, StorageRouter};
use crate::types::{AnalysisKind, AnalysisOutcome, EnrichmentResult, Evidence, EvidenceSource};

/// Structured result of one run. Always produced, even on failure.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub success: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub stats: StatsSnapshot,
    pub summary: RunSummary,
    pub service_stats: BTreeMap<String, ServiceStatsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Merged records, only when the pipeline is configured to return them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<MergedRecord>>,
}

/// Terminal bucket for a submission that entered the analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Analyzed,
    Copied,
}

enum Halt {
    Cancelled(&'static str),
    Failed(EnrichmentError),
}

pub struct EnrichmentOrchestrator {
    config: PipelineConfig,
    source: Arc<dyn Source>,
    filter: QualityFilter,
    resolver: ConceptResolver,
    reuse: EvidenceReuseEngine,
    services: ServiceFactory,
    router: StorageRouter,
    stats: PipelineStats,
}

impl EnrichmentOrchestrator {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn Source>,
        concepts: Arc<dyn ConceptStore>,
        services: ServiceFactory,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            filter: QualityFilter::new(config.quality.clone()),
            resolver: ConceptResolver::new(concepts.clone()),
            reuse: EvidenceReuseEngine::new(concepts, config.reuse, config.services),
            router: StorageRouter::new(sink, config.dry_run),
            stats: PipelineStats::new(),
            source,
            services,
            config,
        }
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn services(&self) -> &ServiceFactory {
        &self.services
    }

    /// Zero pipeline and per-service counters. Runs never do this themselves.
    pub fn reset_statistics(&self) {
        self.stats.reset();
        self.services.reset_all_statistics();
    }

    pub async fn run(&self) -> RunReport {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Run one batch, stopping early if `cancel` fires or the configured
    /// deadline passes. In-flight submissions are abandoned on stop; counters
    /// gathered so far are still reported.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> RunReport {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            %run_id,
            source = self.source.name(),
            limit = self.config.batch_limit,
            concurrency = self.config.concurrency,
            dry_run = self.config.dry_run,
            "enrichment run starting"
        );

        let deadline = self.config.deadline_secs.map(Duration::from_secs);
        let deadline_elapsed = async move {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        let mut data = Vec::new();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Halt::Cancelled("run cancelled")),
            () = deadline_elapsed => Err(Halt::Cancelled("run deadline exceeded")),
            result = self.execute(&mut data) => result.map_err(Halt::Failed),
        };

        let (success, cancelled, error) = match outcome {
            Ok(()) => (true, false, None),
            Err(Halt::Cancelled(reason)) => {
                tracing::warn!(%run_id, reason, "enrichment run stopped early");
                (false, true, Some(reason.to_string()))
            }
            Err(Halt::Failed(e)) => {
                tracing::error!(%run_id, error = %e, "enrichment run failed");
                (false, false, Some(e.to_string()))
            }
        };

        let stats = self.stats.snapshot();
        let summary = RunSummary::from_snapshot(&stats, self.config.cost_per_analysis_usd);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            %run_id,
            success,
            fetched = stats.fetched,
            filtered = stats.filtered_out,
            analyzed = stats.analyzed,
            copied = stats.copied,
            stored = stats.stored,
            errors = stats.errors,
            dedup_rate = summary.dedup_rate,
            duration_ms,
            "enrichment run finished"
        );

        RunReport {
            run_id,
            success,
            cancelled,
            duration_ms,
            stats,
            summary,
            service_stats: self.services.all_statistics(),
            error,
            data: self.config.return_data.then_some(data),
        }
    }

    async fn execute(&self, data: &mut Vec<MergedRecord>) -> Result<(), EnrichmentError> {
        let query = SourceQuery::new(self.config.batch_limit, self.config.subreddits.clone());
        let batch = self.source.fetch(&query).await?;
        self.stats.record_fetched(count(batch.len()));
        if batch.is_empty() {
            tracing::info!("source returned no submissions");
            return Ok(());
        }

        let (passed, rejected) = self.filter.partition(batch);
        self.stats.record_filtered_out(count(rejected.len()));
        tracing::info!(
            passed = passed.len(),
            filtered = rejected.len(),
            "quality filter applied"
        );

        let concepts = if self.config.reuse.enabled {
            self.resolver.resolve(&passed).await
        } else {
            HashMap::new()
        };

        let mut results = pin!(stream::iter(passed)
            .map(|submission| {
                let concept = concepts.get(&submission.id).copied();
                self.process(submission, concept)
            })
            .buffer_unordered(self.config.concurrency.max(1)));

        while let Some(result) = results.next().await {
            if let Some(record) = result? {
                if self.config.return_data {
                    data.push(record);
                }
            }
        }
        Ok(())
    }

    /// Enrich and persist one submission.
    ///
    /// Per-submission failures are counted and swallowed (`Ok(None)`); only a
    /// sink outage is returned as `Err`.
    async fn process(
        &self,
        submission: Submission,
        concept: Option<ResolvedConcept>,
    ) -> Result<Option<MergedRecord>, EnrichmentError> {
        let (record, bucket) = match self.enrich(&submission, concept.as_ref()).await {
            Ok(enriched) => enriched,
            Err(e) => {
                self.stats.record_error();
                tracing::error!(submission = %submission.id, error = %e, "enrichment failed");
                return Ok(None);
            }
        };

        match bucket {
            Bucket::Analyzed => self.stats.record_analyzed(),
            Bucket::Copied => self.stats.record_copied(),
        }
        if record.needs_review {
            self.stats.record_flagged();
        }

        let written = self.router.persist(&record).await?;
        if written.counts_as_stored() {
            self.stats.record_stored();
        }
        Ok(Some(record))
    }

    async fn enrich(
        &self,
        submission: &Submission,
        concept: Option<&ResolvedConcept>,
    ) -> Result<(MergedRecord, Bucket), EnrichmentError> {
        let reused = match concept {
            Some(concept) => self.reuse.attempt(submission, concept).await,
            None => None,
        };

        let mut record = MergedRecord {
            submission_id: submission.id.clone(),
            subreddit: submission.subreddit.clone(),
            title: submission.title.clone(),
            concept_id: concept.map(|c| c.concept_id),
            copied_kinds: Vec::new(),
            needs_review: false,
            integrity_issues: Vec::new(),
            fields: EnrichmentResult::new(),
        };
        let mut evidence: Option<Evidence> = None;

        if let Some(reused) = reused {
            record.fields = reused.result;
            record.copied_kinds = reused.copied;
            record.needs_review = reused.needs_review;
            record.integrity_issues = reused.integrity_issues;
            evidence = reused.evidence;
        }

        for (kind, service) in self.services.iter() {
            if record.copied_kinds.contains(&kind) {
                continue;
            }

            let outcome = match service.enrich(submission, evidence.as_ref()).await? {
                AnalysisOutcome::Opportunity(assessment) => AnalysisOutcome::Opportunity(
                    assessment.gate_with_profile(profiled_function_count(&record.fields)),
                ),
                other => other,
            };
            if let AnalysisOutcome::Monetization(analysis) = &outcome {
                evidence = Some(Evidence::from_monetization(
                    analysis,
                    EvidenceSource::Analyzed(AnalysisKind::Monetization),
                ));
            }
            if let Some(issue) = outcome.integrity() {
                tracing::warn!(submission = %submission.id, kind = %kind, error = %issue, "integrity issue");
                record.needs_review = true;
                record.integrity_issues.push(issue.to_string());
            }

            let refused = record.fields.merge(outcome.into_result());
            if !refused.is_empty() {
                tracing::warn!(submission = %submission.id, kind = %kind, ?refused, "kept earlier values for overlapping fields");
            }
        }

        let bucket = if record.copied_kinds.is_empty() {
            Bucket::Analyzed
        } else {
            Bucket::Copied
        };
        tracing::debug!(submission = %submission.id, ?bucket, fields = record.fields.len(), "submission enriched");
        Ok((record, bucket))
    }
}

/// Function count proposed by the profile already merged into `fields`, or
/// `0` without a profile.
fn profiled_function_count(fields: &EnrichmentResult) -> usize {
    let listed = fields
        .get(AnalysisKind::Profiler, "core_functions")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let declared = fields
        .get(AnalysisKind::Profiler, "function_count")
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    listed.max(declared)
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
