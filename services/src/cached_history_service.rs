use crate::{CacheService, HistoryStore};
use crate::history_store::{HistoryQuery, NewRecord};
use anyhow::Result;
use restbench_shared::HistoryPage;
use std::sync::Arc;
use std::time::Duration;

/// Bumped on every mutation; it is part of each page key, so one INCR retires all cached pages
pub const GENERATION_KEY: &str = "history:generation";

/// Wrapper around HistoryStore that caches list pages in Redis
pub struct CachedHistoryService {
    store: Arc<HistoryStore>,
    cache_service: Arc<CacheService>,
    cache_ttl_pages: Duration,
}

impl CachedHistoryService {
    pub fn new(
        store: Arc<HistoryStore>,
        cache_service: Arc<CacheService>,
        cache_ttl_pages: Duration,
    ) -> Self {
        Self {
            store,
            cache_service,
            cache_ttl_pages,
        }
    }

    /// Best-effort insert; a stored record invalidates cached pages
    pub async fn record(&self, record: NewRecord) -> Option<i32> {
        let id = self.store.record(record).await;
        if id.is_some() {
            self.invalidate().await;
        }
        id
    }

    /// Get one history page (cached per generation, page and filters)
    pub async fn query(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        if !self.cache_service.is_enabled() {
            return self.store.query(query).await;
        }

        let generation = match self.cache_service.counter(GENERATION_KEY).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                log::warn!("History cache unavailable, reading from database: {}", e);
                None
            }
        };

        let Some(generation) = generation else {
            return self.store.query(query).await;
        };

        let cache_key = page_cache_key(generation, query);

        match self.cache_service.get::<HistoryPage>(&cache_key).await {
            Ok(Some(cached)) => {
                log::debug!("History cache hit: {}", cache_key);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read history cache key {}: {}", cache_key, e),
        }

        // Cache miss - query database
        let result = self.store.query(query).await?;

        if let Err(e) = self
            .cache_service
            .set(&cache_key, &result, Some(self.cache_ttl_pages))
            .await
        {
            log::warn!("Failed to cache history page {}: {}", cache_key, e);
        }

        Ok(result)
    }

    pub async fn clear_all(&self) -> Result<u64> {
        let removed = self.store.clear_all().await?;
        self.invalidate().await;
        Ok(removed)
    }

    async fn invalidate(&self) {
        if !self.cache_service.is_enabled() {
            return;
        }
        if let Err(e) = self.cache_service.increment(GENERATION_KEY).await {
            log::warn!("Failed to invalidate history cache: {}", e);
        }
    }
}

fn page_cache_key(generation: i64, query: &HistoryQuery) -> String {
    format!(
        "history:v{}:page:{}:limit:{}:{}",
        generation,
        query.page,
        query.limit,
        query.filter.cache_fragment()
    )
}
