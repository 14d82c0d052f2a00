//! Resolver observability: lookup outcome counters and a round-trip latency
//! histogram for remote translation requests.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

/// Fixed-capacity ring of latency samples (milliseconds).
struct LatencyRing {
    samples: Vec<f64>,
    pos: usize,
    capacity: usize,
}

impl LatencyRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            pos: 0,
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(value);
            return;
        }
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % self.capacity;
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

pub struct ResolverMetrics {
    dispatched: AtomicU64,
    cache_hits: AtomicU64,
    suppressed: AtomicU64,
    deduplicated: AtomicU64,
    skipped: AtomicU64,
    remote_failures: AtomicU64,
    round_trip: Mutex<LatencyRing>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub cache_hits: u64,
    pub suppressed: u64,
    pub deduplicated: u64,
    pub skipped: u64,
    pub remote_failures: u64,
    pub round_trip_p50_ms: f64,
    pub round_trip_p95_ms: f64,
}

impl ResolverMetrics {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(ring_capacity: usize) -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            remote_failures: AtomicU64::new(0),
            round_trip: Mutex::new(LatencyRing::new(ring_capacity.max(1))),
        }
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self, elapsed_ms: f64, failed: bool) {
        if failed {
            self.remote_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.round_trip.lock().push(elapsed_ms);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Round-trip percentile (p in 0-100), in milliseconds.
    pub fn round_trip_percentile(&self, p: f64) -> f64 {
        self.round_trip.lock().percentile(p)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            round_trip_p50_ms: self.round_trip_percentile(50.0),
            round_trip_p95_ms: self.round_trip_percentile(95.0),
        }
    }
}

impl Default for ResolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}
