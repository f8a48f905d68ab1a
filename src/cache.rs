use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

use crate::errors::AppError;

#[derive(Debug, Clone)]
struct CachedPage {
    body: String,
    stored_at: Instant,
}

impl CachedPage {
    fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Time bounded store of rendered pages. Entries are never evicted by writes
/// to the underlying data, only by age or by [`PageCache::clear`].
#[derive(Debug, Clone)]
pub struct PageCache {
    ttl: Duration,
    slots: Arc<RwLock<HashMap<String, CachedPage>>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let slots = self.slots.read().await;
        slots
            .get(key)
            .filter(|page| page.is_fresh_at(Instant::now(), self.ttl))
            .map(|page| page.body.clone())
    }

    pub async fn set(&self, key: impl Into<String>, body: String) {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        slots.retain(|_, page| page.is_fresh_at(now, self.ttl));
        slots.insert(
            key.into(),
            CachedPage {
                body,
                stored_at: now,
            },
        );
    }

    pub async fn clear(&self) {
        self.slots.write().await.clear();
        tracing::info!("page cache cleared");
    }

    pub async fn get_or_render<F, Fut>(&self, key: String, render: F) -> Result<String, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        if let Some(body) = self.get(&key).await {
            tracing::debug!(key = %key, "page cache hit");
            return Ok(body);
        }
        let body = render().await?;
        self.set(key, body.clone()).await;
        Ok(body)
    }
}
