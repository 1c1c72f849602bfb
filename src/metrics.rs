//! Serving metrics: query latency and the share of the corpus each query touched.

use std::time::Duration;

/// Collects runtime metrics for a running retrieval service.
#[derive(Debug)]
pub struct MetricsCollector {
    query_latencies_us: Vec<f64>,
    /// Running sum over answered queries
    touched_fraction_sum: f64,
    total_queries: u64,
    failed_queries: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            query_latencies_us: Vec::new(),
            touched_fraction_sum: 0.0,
            total_queries: 0,
            failed_queries: 0,
        }
    }

    /// Record an answered query with its duration and touched fraction.
    pub fn record_query(&mut self, duration: Duration, touched_fraction: f64) {
        self.total_queries += 1;
        self.query_latencies_us.push(duration.as_micros() as f64);
        self.touched_fraction_sum += touched_fraction;
    }

    /// Record a query rejected before retrieval (bad vector, unknown user).
    pub fn record_failure(&mut self) {
        self.failed_queries += 1;
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries
    }

    /// Average query latency in microseconds.
    pub fn avg_query_latency_us(&self) -> f64 {
        if self.query_latencies_us.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.query_latencies_us.iter().sum();
        sum / self.query_latencies_us.len() as f64
    }

    /// Mean fraction of the corpus scored per answered query.
    pub fn avg_touched_fraction(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.touched_fraction_sum / self.total_queries as f64
    }

    /// Get a percentile of query latency (e.g., 50.0, 95.0, 99.0).
    pub fn percentile_query_latency_us(&self, percentile: f64) -> f64 {
        if self.query_latencies_us.is_empty() {
            return 0.0;
        }

        let mut sorted = self.query_latencies_us.clone();
        sorted.sort_by(f64::total_cmp);

        let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
