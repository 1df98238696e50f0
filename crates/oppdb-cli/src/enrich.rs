//! `enrich run`: wire collaborators from config and flags, then run one batch.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use oppdb_core::{AppConfig, PipelineConfig, Submission};
use oppdb_enrich::{
    ConceptStore, DryRunSink, EnrichmentError, EnrichmentOrchestrator, InMemoryConceptStore,
    InMemorySink, InMemorySource, RunReport, ServiceFactory, Sink, Source, SourceQuery,
};
use tokio_util::sync::CancellationToken;

use crate::RunArgs;

/// Reads a JSON array of submissions on every fetch.
#[derive(Debug, Clone)]
pub(crate) struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Source for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Submission>, EnrichmentError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| EnrichmentError::Source(format!("{}: {e}", self.path.display())))?;
        let submissions: Vec<Submission> = serde_json::from_str(&raw)
            .map_err(|e| EnrichmentError::Source(format!("{}: {e}", self.path.display())))?;
        InMemorySource::new(submissions).fetch(query).await
    }
}

/// Apply command-line overrides on top of the configured pipeline settings.
///
/// A file source reads every subreddit in the file unless `--subreddit` is
/// given.
pub(crate) fn pipeline_config(base: &PipelineConfig, args: &RunArgs) -> PipelineConfig {
    let mut pipeline = base.clone();
    if let Some(limit) = args.limit {
        pipeline.batch_limit = limit;
    }
    if !args.subreddits.is_empty() {
        pipeline.subreddits.clone_from(&args.subreddits);
    } else if args.from_file.is_some() {
        pipeline.subreddits.clear();
    }
    if let Some(concurrency) = args.concurrency {
        pipeline.concurrency = concurrency.max(1);
    }
    if args.deadline_secs.is_some() {
        pipeline.deadline_secs = args.deadline_secs;
    }
    pipeline.dry_run |= args.dry_run;
    pipeline.return_data |= args.return_data;
    pipeline
}

fn build_source(config: &AppConfig, args: &RunArgs) -> anyhow::Result<Arc<dyn Source>> {
    if let Some(path) = &args.from_file {
        return Ok(Arc::new(FileSource::new(path.clone())));
    }
    let source = oppdb_reddit::RedditSource::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("reddit source is not configured: {e}"))?;
    Ok(Arc::new(source))
}

/// Pick the concept store and sink.
///
/// `--in-memory` never touches the database. A dry run reads prior concepts
/// from Postgres when `DATABASE_URL` is set and discards every record.
async fn build_storage(
    config: &AppConfig,
    args: &RunArgs,
    dry_run: bool,
) -> anyhow::Result<(Arc<dyn ConceptStore>, Arc<dyn Sink>)> {
    let discard: Arc<dyn Sink> = Arc::new(DryRunSink);

    if args.in_memory {
        let sink: Arc<dyn Sink> = if dry_run {
            discard
        } else {
            Arc::new(InMemorySink::new())
        };
        return Ok((Arc::new(InMemoryConceptStore::new()), sink));
    }

    if config.database_url.is_none() && dry_run {
        tracing::warn!("DATABASE_URL not set; dry run proceeds without prior concepts");
        return Ok((Arc::new(InMemoryConceptStore::new()), discard));
    }

    let pool = oppdb_db::connect_pool_from_config(config).await?;
    let sink: Arc<dyn Sink> = if dry_run {
        discard
    } else {
        Arc::new(oppdb_db::PgSink::new(pool.clone()))
    };
    Ok((Arc::new(oppdb_db::PgConceptStore::new(pool)), sink))
}

/// Run one batch. Ctrl-C cancels the run; partial statistics are still
/// reported.
///
/// # Errors
///
/// Returns an error when a collaborator cannot be constructed: missing Reddit
/// credentials, a missing or unreachable database. Failures during the run
/// are reported in the returned [`RunReport`].
pub(crate) async fn run_enrich(config: &AppConfig, args: &RunArgs) -> anyhow::Result<RunReport> {
    let pipeline = pipeline_config(&config.pipeline, args);
    let source = build_source(config, args)?;
    let (concepts, sink) = build_storage(config, args, pipeline.dry_run).await?;

    let services = ServiceFactory::from_app_config(config);
    let inert = services.fallback_kinds();
    if !inert.is_empty() {
        tracing::warn!(kinds = ?inert, "LLM client unavailable; these services run inert");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping run");
            on_interrupt.cancel();
        }
    });

    let orchestrator = EnrichmentOrchestrator::new(pipeline, source, concepts, services, sink);
    let report = orchestrator.run_with_cancel(cancel).await;
    Ok(report)
}
