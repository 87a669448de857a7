//! Serving metrics for the classifier API.
//!
//! Queries are split by whether they paid for an index rebuild. A *cold*
//! query found the anchor lists stale (or the anchor set short) and rebuilt
//! them before searching; a *warm* query walked lists that were already
//! current. Their latencies differ by orders of magnitude, so each kind keeps
//! its own window of recent samples.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of recent latencies kept per query kind.
pub const LATENCY_WINDOW: usize = 1024;

/// Whether a query had to rebuild the anchor index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Warm,
    Cold,
}

/// Summary of a latency window, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Samples currently in the window.
    pub samples: usize,
    pub avg_us: f64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// The most recent query latencies, oldest evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples_us: VecDeque<u64>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples_us: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples_us.len() == self.capacity {
            self.samples_us.pop_front();
        }
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.samples_us.push_back(micros);
    }

    pub fn len(&self) -> usize {
        self.samples_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_us.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Average and nearest-rank percentiles over the window, from one sort.
    pub fn summary(&self) -> LatencySummary {
        if self.samples_us.is_empty() {
            return LatencySummary::default();
        }

        let mut sorted: Vec<u64> = self.samples_us.iter().copied().collect();
        sorted.sort_unstable();
        let total: u128 = sorted.iter().map(|&s| s as u128).sum();

        let rank = |percentile: usize| {
            let n = sorted.len();
            let index = ((percentile * n + 99) / 100).saturating_sub(1);
            sorted[index.min(n - 1)]
        };

        LatencySummary {
            samples: sorted.len(),
            avg_us: total as f64 / sorted.len() as f64,
            p50_us: rank(50),
            p95_us: rank(95),
            p99_us: rank(99),
        }
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::with_capacity(LATENCY_WINDOW)
    }
}

/// Counters and latency windows for a served classifier.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    warm: LatencyWindow,
    cold: LatencyWindow,
    total_queries: u64,
    cold_queries: u64,
    total_inserts: u64,
    total_anchor_resets: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `window` recent latencies per query kind.
    pub fn with_window(window: usize) -> Self {
        Self {
            warm: LatencyWindow::with_capacity(window),
            cold: LatencyWindow::with_capacity(window),
            ..Self::default()
        }
    }

    pub fn record_query(&mut self, kind: QueryKind, duration: Duration) {
        self.total_queries += 1;
        match kind {
            QueryKind::Warm => self.warm.record(duration),
            QueryKind::Cold => {
                self.cold_queries += 1;
                self.cold.record(duration);
            }
        }
    }

    pub fn record_inserts(&mut self, count: usize) {
        self.total_inserts += count as u64;
    }

    /// Record an explicit anchor re-selection.
    pub fn record_anchor_reset(&mut self) {
        self.total_anchor_resets += 1;
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    /// Queries that rebuilt the anchor index before searching.
    pub fn cold_queries(&self) -> u64 {
        self.cold_queries
    }

    pub fn total_inserts(&self) -> u64 {
        self.total_inserts
    }

    pub fn total_anchor_resets(&self) -> u64 {
        self.total_anchor_resets
    }

    pub fn warm_latency(&self) -> &LatencyWindow {
        &self.warm
    }

    pub fn cold_latency(&self) -> &LatencyWindow {
        &self.cold
    }
}
