// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Benefits lookup service.
//!
//! Each operation checks the response cache, falls back to the upstream on a
//! miss, validates the payload shape and caches only non-empty results.
//! Upstream errors are returned untouched; mapping them to client responses
//! happens at the HTTP boundary.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use crate::cache::{CacheKey, ResponseCache};
use crate::metrics::Metrics;
use crate::model::{has_benefits, unwrap_envelope, Lookup};
use crate::upstream::{BenefitsSource, UpstreamError};

/// What a fresh upstream payload has to look like to count as found.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Body with a non-empty `beneficios` array.
    List,
    /// Any non-null body.
    Item,
}

#[derive(Clone)]
pub struct BenefitsService {
    source: Arc<dyn BenefitsSource>,
    cache: ResponseCache,
    metrics: Metrics,
}

impl BenefitsService {
    pub fn new(source: Arc<dyn BenefitsSource>, cache: ResponseCache, metrics: Metrics) -> Self {
        Self {
            source,
            cache,
            metrics,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn list_page(&self, page: u64) -> Result<Lookup<Value>, UpstreamError> {
        let key = CacheKey::Page(page);
        self.lookup(key, Shape::List, || self.source.fetch_list(Some(page)))
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Lookup<Value>, UpstreamError> {
        let key = CacheKey::Benefit(id.to_string());
        self.lookup(key, Shape::Item, || self.source.fetch_by_id(id))
            .await
    }

    pub async fn get_by_commerce(&self, name: &str) -> Result<Lookup<Value>, UpstreamError> {
        let key = CacheKey::Commerce(name.to_string());
        self.lookup(key, Shape::List, || self.source.fetch_by_commerce(name))
            .await
    }

    async fn lookup<F, Fut>(
        &self,
        key: CacheKey,
        shape: Shape,
        fetch: F,
    ) -> Result<Lookup<Value>, UpstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, UpstreamError>>,
    {
        if let Some(cached) = self.cache.get(&key).await {
            self.metrics.record_cache_hit();
            tracing::info!(%key, "cache hit");
            return Ok(Lookup::Found(cached));
        }

        self.metrics.record_cache_miss();
        tracing::info!(%key, "cache miss, fetching from upstream");

        self.metrics.record_upstream_request();
        let start = Instant::now();
        let result = fetch().await;
        self.metrics
            .record_upstream_latency(start.elapsed().as_secs_f64());

        let raw = result.inspect_err(|error| {
            self.metrics.record_upstream_failure();
            tracing::error!(%key, %error, "upstream lookup failed");
        })?;

        let body = unwrap_envelope(raw).filter(|body| match shape {
            Shape::List => has_benefits(body),
            Shape::Item => true,
        });

        let Some(body) = body else {
            tracing::warn!(%key, "no data found in upstream response");
            return Ok(Lookup::NotFound);
        };

        self.cache.set(&key, body.clone()).await;
        self.metrics.record_cache_store();
        self.metrics.update_cache_entries(self.cache.len().await);

        Ok(Lookup::Found(body))
    }
}
