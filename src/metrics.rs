// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics for the gateway.
//!
//! Tracks cache effectiveness and upstream health.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

use crate::error::AppError;

/// Metrics collector for the gateway
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,

    // Cache metrics
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_stores: IntCounter,
    pub cache_entries: IntGauge,

    // Upstream metrics
    pub upstream_requests: IntCounter,
    pub upstream_failures: IntCounter,
    pub upstream_latency: Histogram,
}

fn metric_error(e: prometheus::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e))
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let cache_hits = IntCounter::with_opts(Opts::new(
            "beneficios_cache_hits_total",
            "Total number of lookups answered from the cache",
        ))
        .map_err(metric_error)?;

        let cache_misses = IntCounter::with_opts(Opts::new(
            "beneficios_cache_misses_total",
            "Total number of lookups that had to go upstream",
        ))
        .map_err(metric_error)?;

        let cache_stores = IntCounter::with_opts(Opts::new(
            "beneficios_cache_stores_total",
            "Total number of upstream payloads written to the cache",
        ))
        .map_err(metric_error)?;

        let cache_entries = IntGauge::with_opts(Opts::new(
            "beneficios_cache_entries",
            "Entries currently held by the cache, stale ones included",
        ))
        .map_err(metric_error)?;

        let upstream_requests = IntCounter::with_opts(Opts::new(
            "beneficios_upstream_requests_total",
            "Total number of requests sent to the benefits API",
        ))
        .map_err(metric_error)?;

        let upstream_failures = IntCounter::with_opts(Opts::new(
            "beneficios_upstream_failures_total",
            "Total number of benefits API requests that resulted in an error",
        ))
        .map_err(metric_error)?;

        let upstream_latency = Histogram::with_opts(
            HistogramOpts::new(
                "beneficios_upstream_latency_seconds",
                "Duration of benefits API requests in seconds",
            )
            .buckets(vec![
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.0, 5.0, 10.0,
            ]),
        )
        .map_err(metric_error)?;

        let collectors: [Box<dyn prometheus::core::Collector>; 7] = [
            Box::new(cache_hits.clone()),
            Box::new(cache_misses.clone()),
            Box::new(cache_stores.clone()),
            Box::new(cache_entries.clone()),
            Box::new(upstream_requests.clone()),
            Box::new(upstream_failures.clone()),
            Box::new(upstream_latency.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to register metric: {}", e))
            })?;
        }

        Ok(Self {
            registry: Arc::new(registry),
            cache_hits,
            cache_misses,
            cache_stores,
            cache_entries,
            upstream_requests,
            upstream_failures,
            upstream_latency,
        })
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn record_cache_store(&self) {
        self.cache_stores.inc();
    }

    pub fn update_cache_entries(&self, entries: usize) {
        self.cache_entries.set(entries as i64);
    }

    pub fn record_upstream_request(&self) {
        self.upstream_requests.inc();
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures.inc();
    }

    /// Observe latency for an upstream request in seconds
    pub fn record_upstream_latency(&self, seconds: f64) {
        self.upstream_latency.observe(seconds);
    }

    /// Export metrics in Prometheus format
    pub fn export(&self) -> Result<String, AppError> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to convert metrics to string: {}",
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_recorded_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.update_cache_entries(3);
        metrics.record_upstream_latency(0.2);

        let text = metrics.export().unwrap();
        assert!(text.contains("beneficios_cache_hits_total 2"));
        assert!(text.contains("beneficios_cache_misses_total 1"));
        assert!(text.contains("beneficios_cache_entries 3"));
        assert!(text.contains("beneficios_upstream_latency_seconds_count 1"));
    }

    #[test]
    fn instances_do_not_share_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_upstream_failure();

        assert_eq!(first.upstream_failures.get(), 1);
        assert_eq!(second.upstream_failures.get(), 0);
    }
}
