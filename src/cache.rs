//! Time-bounded memoisation of vendor results.
//!
//! News batches and extracted article text are cached by content key so that
//! repeating a query inside the same process does not call the vendor again.
//! Expiry is purely time based; nothing is ever invalidated explicitly.

use crate::error::Result;
use crate::models::{NewsBatch, NewsQuery};
use crate::vendors::NewsSource;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// A map whose entries disappear `ttl` after insertion.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored, value)) if now.duration_since(*stored) < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, (stored, _)| now.duration_since(*stored) < self.ttl);
            entries.insert(key, (now, value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache").field("ttl", &self.ttl).finish()
    }
}

/// Wrapper that memoises any [`NewsSource`] by query.
pub struct CachedNews<T> {
    inner: T,
    cache: TtlCache<NewsQuery, NewsBatch>,
}

impl<T> CachedNews<T>
where
    T: NewsSource,
{
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }
}

impl<T> fmt::Debug for CachedNews<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedNews").field("cache", &self.cache).finish()
    }
}

impl<T> NewsSource for CachedNews<T>
where
    T: NewsSource,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[instrument(level = "info", skip_all, fields(source = self.inner.name()))]
    async fn search_news(&self, query: &NewsQuery) -> Result<NewsBatch> {
        if let Some(hit) = self.cache.get(query) {
            debug!(count = hit.items.len(), "News cache hit");
            return Ok(hit);
        }
        let batch = self.inner.search_news(query).await?;
        self.cache.insert(query.clone(), batch.clone());
        debug!(entries = self.cache.len(), "Cached news batch");
        Ok(batch)
    }
}
