//! Metrics collection for the stats pipeline
//!
//! Thread-safe counters using atomic operations. They track requests, cache
//! hits and misses, upstream fetches and latencies, and render as Prometheus
//! text for the `/metrics` route.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const PREFIX: &str = "player_stats";

/// Metrics collector for the stats pipeline
///
/// All operations are thread-safe using atomic operations.
#[derive(Debug, Default)]
pub struct StatsMetrics {
    // Request statistics
    total_requests: AtomicU64,
    client_errors: AtomicU64,
    not_found: AtomicU64,

    // Cache statistics
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    cache_writes: AtomicU64,

    // Upstream statistics
    upstream_fetches: AtomicU64,
    upstream_failures: AtomicU64,

    // Shaping statistics
    patch_failures: AtomicU64,

    // Latency statistics (stored as microseconds)
    total_request_duration_us: AtomicU64,
    total_upstream_duration_us: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub client_errors: u64,
    pub not_found: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub cache_writes: u64,

    pub upstream_fetches: u64,
    pub upstream_failures: u64,

    pub patch_failures: u64,

    pub total_request_duration_us: u64,
    pub total_upstream_duration_us: u64,
}

impl StatsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handled request and how long it took
    pub fn record_request(&self, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_request_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a request rejected as malformed
    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upstream fetch
    ///
    /// # Arguments
    /// * `success` - Whether the fetch produced a document
    /// * `duration` - Time spent waiting on the upstream
    pub fn record_upstream_fetch(&self, success: bool, duration: Duration) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.upstream_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_upstream_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_patch_failure(&self) {
        self.patch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Fields are loaded independently, so a snapshot taken under load may
    /// not be perfectly consistent across fields.
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            patch_failures: self.patch_failures.load(Ordering::Relaxed),
            total_request_duration_us: self.total_request_duration_us.load(Ordering::Relaxed),
            total_upstream_duration_us: self.total_upstream_duration_us.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Cache hit rate as a percentage (0.0 to 100.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// Average request duration in milliseconds
    pub fn avg_request_duration_ms(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.total_request_duration_us as f64 / self.total_requests as f64) / 1000.0
        }
    }

    /// Average upstream fetch duration in milliseconds
    pub fn avg_upstream_duration_ms(&self) -> f64 {
        if self.upstream_fetches == 0 {
            0.0
        } else {
            (self.total_upstream_duration_us as f64 / self.upstream_fetches as f64) / 1000.0
        }
    }
}

fn write_metric(output: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(output, "# HELP {PREFIX}_{name} {help}");
    let _ = writeln!(output, "# TYPE {PREFIX}_{name} {kind}");
    let _ = writeln!(output, "{PREFIX}_{name} {value}");
    output.push('\n');
}

/// Format metrics in Prometheus exposition format
///
/// Each metric carries a HELP line and a TYPE line.
pub fn format_prometheus_metrics(snapshot: &MetricsSnapshot) -> String {
    let mut output = String::new();

    write_metric(&mut output, "requests_total", "counter", "Total number of stats requests handled", snapshot.total_requests);
    write_metric(&mut output, "client_errors_total", "counter", "Requests rejected as malformed", snapshot.client_errors);
    write_metric(&mut output, "not_found_total", "counter", "Requests for players the upstream does not know", snapshot.not_found);

    write_metric(&mut output, "cache_hits_total", "counter", "Number of cache hits", snapshot.cache_hits);
    write_metric(&mut output, "cache_misses_total", "counter", "Number of cache misses", snapshot.cache_misses);
    write_metric(&mut output, "cache_errors_total", "counter", "Number of absorbed cache backend errors", snapshot.cache_errors);
    write_metric(&mut output, "cache_writes_total", "counter", "Number of documents written to the cache", snapshot.cache_writes);
    write_metric(&mut output, "cache_hit_rate", "gauge", "Cache hit rate percentage", format!("{:.2}", snapshot.cache_hit_rate()));

    write_metric(&mut output, "upstream_fetches_total", "counter", "Total number of upstream fetches", snapshot.upstream_fetches);
    write_metric(&mut output, "upstream_failures_total", "counter", "Number of failed upstream fetches", snapshot.upstream_failures);
    write_metric(&mut output, "patch_failures_total", "counter", "Number of documents a patch could not be applied to", snapshot.patch_failures);

    write_metric(&mut output, "request_duration_ms_avg", "gauge", "Average request duration in milliseconds", format!("{:.2}", snapshot.avg_request_duration_ms()));
    write_metric(&mut output, "upstream_duration_ms_avg", "gauge", "Average upstream fetch duration in milliseconds", format!("{:.2}", snapshot.avg_upstream_duration_ms()));

    output
}
