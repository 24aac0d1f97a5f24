//! Per-collection statistics
//!
//! Counters are monotonic except the `active_*` gauges, which track work
//! in flight and return to zero when it ends.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Statistics of one collection.
///
/// All updates use Relaxed ordering; readers get a consistent-enough view
/// through [`CollectionStats::snapshot`].
#[derive(Debug, Default)]
pub struct CollectionStats {
    queries: AtomicU64,
    failed_queries: AtomicU64,
    slow_queries: AtomicU64,
    active_queries: AtomicU64,
    active_waits: AtomicU64,
    active_subscriptions: AtomicU64,
    observed_documents: AtomicU64,
    query_time_ms: AtomicU64,
}

impl CollectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_query(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slow_query(&self) {
        self.slow_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_observed_document(&self) {
        self.observed_documents.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_query_time(&self, ms: u64) {
        self.query_time_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Marks a query in flight until the guard drops
    pub fn begin_query(&self) -> ActiveGuard<'_> {
        ActiveGuard::enter(&self.active_queries)
    }

    /// Marks a wait-for call in flight until the guard drops
    pub fn begin_wait(&self) -> ActiveGuard<'_> {
        ActiveGuard::enter(&self.active_waits)
    }

    pub fn subscription_opened(&self) {
        self.active_subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_closed(&self) {
        let _ = self
            .active_subscriptions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            taken_at: Utc::now(),
            queries: self.queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
            active_queries: self.active_queries.load(Ordering::Relaxed),
            active_waits: self.active_waits.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
            observed_documents: self.observed_documents.load(Ordering::Relaxed),
            query_time_ms: self.query_time_ms.load(Ordering::Relaxed),
        }
    }
}

/// Decrements its gauge on drop
#[derive(Debug)]
pub struct ActiveGuard<'a> {
    gauge: &'a AtomicU64,
}

impl<'a> ActiveGuard<'a> {
    fn enter(gauge: &'a AtomicU64) -> Self {
        gauge.fetch_add(1, Ordering::Relaxed);
        Self { gauge }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`CollectionStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub active_queries: u64,
    pub active_waits: u64,
    pub active_subscriptions: u64,
    pub observed_documents: u64,
    pub query_time_ms: u64,
}
