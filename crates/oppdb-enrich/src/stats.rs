//! Run and per-service counters.
//!
//! All counters are atomics so submissions processed concurrently can update
//! them without a lock. Snapshots are plain copies for reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct PipelineStats {
    fetched: AtomicU64,
    filtered_out: AtomicU64,
    analyzed: AtomicU64,
    copied: AtomicU64,
    stored: AtomicU64,
    errors: AtomicU64,
    flagged_for_review: AtomicU64,
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self, count: u64) {
        self.fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_filtered_out(&self, count: u64) {
        self.filtered_out.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_analyzed(&self) {
        self.analyzed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copied(&self) {
        self.copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flagged(&self) {
        self.flagged_for_review.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            filtered_out: self.filtered_out.load(Ordering::Relaxed),
            analyzed: self.analyzed.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            flagged_for_review: self.flagged_for_review.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.fetched,
            &self.filtered_out,
            &self.analyzed,
            &self.copied,
            &self.stored,
            &self.errors,
            &self.flagged_for_review,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub fetched: u64,
    pub filtered_out: u64,
    pub analyzed: u64,
    pub copied: u64,
    pub stored: u64,
    pub errors: u64,
    pub flagged_for_review: u64,
}

impl StatsSnapshot {
    /// `copied / (analyzed + copied)`, or `0.0` when nothing was processed.
    #[must_use]
    pub fn dedup_rate(&self) -> f64 {
        let denom = self.analyzed + self.copied;
        if denom == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.copied as f64 / denom as f64;
        rate
    }

    /// Submissions that passed the filter but reached no outcome bucket.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.fetched
            .saturating_sub(self.filtered_out)
            .saturating_sub(self.analyzed + self.copied + self.errors)
    }
}

/// End-of-run summary reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_fetched: u64,
    pub total_filtered: u64,
    pub total_analyzed: u64,
    pub total_copied: u64,
    pub total_stored: u64,
    pub total_errors: u64,
    pub flagged_for_review: u64,
    pub pending: u64,
    pub dedup_rate: f64,
    pub estimated_cost_saved_usd: f64,
}

impl RunSummary {
    #[must_use]
    pub fn from_snapshot(stats: &StatsSnapshot, cost_per_analysis_usd: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let estimated_cost_saved_usd = stats.copied as f64 * cost_per_analysis_usd;
        Self {
            total_fetched: stats.fetched,
            total_filtered: stats.filtered_out,
            total_analyzed: stats.analyzed,
            total_copied: stats.copied,
            total_stored: stats.stored,
            total_errors: stats.errors,
            flagged_for_review: stats.flagged_for_review,
            pending: stats.pending(),
            dedup_rate: stats.dedup_rate(),
            estimated_cost_saved_usd,
        }
    }
}

/// Counters kept by each analysis service.
#[derive(Debug, Default)]
pub struct ServiceStats {
    calls: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl ServiceStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call that started at `started` and finished with `result`.
    pub fn observe<T, E>(&self, started: Instant, result: &Result<T, E>) {
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(elapsed, Ordering::Relaxed);
        if result.is_ok() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_ms.load(Ordering::Relaxed),
            inert: false,
        }
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatsSnapshot {
    pub calls: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub total_latency_ms: u64,
    /// `true` when the service is the inert stand-in.
    pub inert: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_rate_is_zero_without_work() {
        assert!(StatsSnapshot::default().dedup_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn dedup_rate_is_copied_share() {
        let s = StatsSnapshot {
            analyzed: 4,
            copied: 6,
            ..StatsSnapshot::default()
        };
        assert!((s.dedup_rate() - 0.6).abs() < 1e-12);

        let all_copied = StatsSnapshot {
            copied: 3,
            ..StatsSnapshot::default()
        };
        assert!((all_copied.dedup_rate() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn summary_prices_reuse() {
        let s = StatsSnapshot {
            fetched: 12,
            filtered_out: 2,
            analyzed: 4,
            copied: 6,
            stored: 10,
            ..StatsSnapshot::default()
        };
        let summary = RunSummary::from_snapshot(&s, 0.25);
        assert!((summary.estimated_cost_saved_usd - 1.5).abs() < 1e-12);
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.total_filtered, 2);
    }

    #[test]
    fn pending_counts_unfinished_submissions() {
        let s = StatsSnapshot {
            fetched: 10,
            filtered_out: 1,
            analyzed: 3,
            copied: 2,
            errors: 1,
            ..StatsSnapshot::default()
        };
        assert_eq!(s.pending(), 3);
    }

    #[test]
    fn pipeline_reset_zeroes_counters() {
        let stats = PipelineStats::new();
        stats.record_fetched(5);
        stats.record_copied();
        stats.record_error();
        assert_eq!(stats.snapshot().fetched, 5);
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn service_stats_split_success_and_failure() {
        let stats = ServiceStats::new();
        stats.observe::<(), ()>(Instant::now(), &Ok(()));
        stats.observe::<(), ()>(Instant::now(), &Err(()));
        stats.observe::<(), ()>(Instant::now(), &Ok(()));
        let snap = stats.snapshot();
        assert_eq!(snap.calls, 3);
        assert_eq!(snap.succeeded, 2);
        assert_eq!(snap.failed, 1);
        stats.reset();
        assert_eq!(stats.snapshot().calls, 0);
    }

    #[tokio::test]
    async fn counters_are_safe_under_concurrency() {
        let stats = std::sync::Arc::new(PipelineStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    stats.record_analyzed();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(stats.snapshot().analyzed, 800);
    }
}
