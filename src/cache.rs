// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Process-local response cache with a fixed time-to-live.
//!
//! Entries expire lazily: a stale entry is dropped the next time it is read
//! and is never swept in the background. Reads do not extend an entry's life.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Keys under which upstream payloads are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    Page(u64),
    Benefit(String),
    Commerce(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Page(page) => write!(f, "all-benefits-page-{page}"),
            CacheKey::Benefit(id) => write!(f, "benefit-{id}"),
            CacheKey::Commerce(value) => write!(f, "benefitsByName:{value}"),
        }
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let key = key.to_string();
        let now = Instant::now();

        {
            let guard = self.inner.read().await;
            match guard.get(&key) {
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut guard = self.inner.write().await;
        // Another writer may have refreshed the key between the two locks.
        if let Some(entry) = guard.get(&key) {
            if !entry.is_expired(now, self.ttl) {
                return Some(entry.value.clone());
            }
            guard.remove(&key);
        }

        None
    }

    pub async fn set(&self, key: &CacheKey, value: Value) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };

        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), entry);
    }

    /// Number of stored entries, including stale ones not yet read back.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn keys_render_stable_strings() {
        assert_eq!(CacheKey::Page(2).to_string(), "all-benefits-page-2");
        assert_eq!(CacheKey::Benefit("17".into()).to_string(), "benefit-17");
        assert_eq!(
            CacheKey::Commerce("Café Martínez".into()).to_string(),
            "benefitsByName:Café Martínez"
        );
    }

    #[tokio::test]
    async fn returns_stored_value_unchanged() {
        let cache = ResponseCache::new(TTL);
        let key = CacheKey::Benefit("1".into());
        let payload = json!({ "id": 1, "nombre": "2x1 en cine", "activo": true });

        assert!(cache.get(&key).await.is_none());
        cache.set(&key, payload.clone()).await;

        assert_eq!(cache.get(&key).await, Some(payload));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(TTL);
        let key = CacheKey::Page(1);
        cache.set(&key, json!({ "beneficios": [1] })).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn hits_do_not_extend_lifetime() {
        let cache = ResponseCache::new(TTL);
        let key = CacheKey::Commerce("gym".into());
        cache.set(&key, json!({ "beneficios": ["a"] })).await;

        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::advance(Duration::from_secs(150)).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_restarts_lifetime() {
        let cache = ResponseCache::new(TTL);
        let key = CacheKey::Page(3);
        cache.set(&key, json!({ "v": 1 })).await;

        tokio::time::advance(Duration::from_secs(250)).await;
        cache.set(&key, json!({ "v": 2 })).await;

        tokio::time::advance(Duration::from_secs(250)).await;
        assert_eq!(cache.get(&key).await, Some(json!({ "v": 2 })));
    }

    #[tokio::test]
    async fn keys_do_not_collide_across_operations() {
        let cache = ResponseCache::new(TTL);
        cache.set(&CacheKey::Page(1), json!("page")).await;
        cache.set(&CacheKey::Benefit("1".into()), json!("benefit")).await;

        assert_eq!(cache.get(&CacheKey::Page(1)).await, Some(json!("page")));
        assert_eq!(
            cache.get(&CacheKey::Benefit("1".into())).await,
            Some(json!("benefit"))
        );
        assert!(cache.get(&CacheKey::Commerce("1".into())).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_writers_leave_a_whole_value() {
        let cache = ResponseCache::new(TTL);
        let key = CacheKey::Page(9);

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let cache = cache.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    cache.set(&key, json!({ "writer": n, "beneficios": [n] })).await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stored = cache.get(&key).await.unwrap();
        assert_eq!(stored["beneficios"][0], stored["writer"]);
        assert_eq!(cache.len().await, 1);
    }
}
