//! Enrichment orchestration for oppdb.
//!
//! Takes a batch of submissions from a [`Source`], drops low-signal ones with
//! the [`QualityFilter`], resolves known business concepts in one bulk lookup,
//! reuses prior analyses where a concept already has them, runs the remaining
//! analysis services, and hands each merged record to the storage router.
//! Outcome counters survive partial failure and feed the end-of-run summary.

pub mod concepts;
pub mod error;
pub mod factory;
pub mod filter;
pub mod llm;
pub mod memory;
pub mod normalize;
pub mod orchestrator;
pub mod reuse;
pub mod scorer;
pub mod services;
pub mod source;
pub mod stats;
pub mod storage;
pub mod types;

mod retry;

pub use concepts::{ConceptResolver, ConceptStore};
pub use error::EnrichmentError;
pub use factory::ServiceFactory;
pub use filter::{passes_quality_filter, QualityFilter};
pub use llm::LlmClient;
pub use memory::{DryRunSink, InMemoryConceptStore, InMemorySink, InMemorySource};
pub use orchestrator::{EnrichmentOrchestrator, RunReport};
pub use reuse::{EvidenceReuseEngine, ReusedEnrichment};
pub use scorer::{
    simplicity_for_count, DimensionScores, IntegrityError, OpportunityAssessment,
    OpportunityScorer, Priority, Simplicity,
};
pub use services::{
    AnalysisService, InertService, MarketValidator, MonetizationAnalyzer, OpportunityAnalyzer,
    Profiler, TrustValidator,
};
pub use source::{Source, SourceQuery};
pub use stats::{PipelineStats, RunSummary, ServiceStats, ServiceStatsSnapshot, StatsSnapshot};
pub use storage::{route, MergedRecord, Sink, SinkOutcome, StorageRouter, StorageShape, WriteOutcome};
pub use types::{
    AnalysisKind, AnalysisOutcome, EnrichmentResult, Evidence, EvidenceSource,
    MarketValidation, MonetizationAnalysis, ProfileAnalysis, TrustBadge, TrustValidation,
};
