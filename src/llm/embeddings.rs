use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::providers::EmbeddingProvider;

pub const DEFAULT_QUERY_CACHE_SIZE: usize = 256;

/// Wraps an embedding provider with an LRU cache of query vectors. Document
/// batches are passed straight through since ingestion never repeats them.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Option<Mutex<LruCache<String, Vec<f32>>>>,
}

impl CachedEmbedder {
    /// A capacity of zero disables caching.
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            inner,
            cache: NonZeroUsize::new(capacity).map(|capacity| Mutex::new(LruCache::new(capacity))),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_documents(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let Some(cache) = &self.cache else {
            return self.inner.embed_query(text).await;
        };

        let key = text.trim().to_string();
        if let Some(hit) = cache.lock().await.get(&key) {
            log::debug!("Query embedding cache hit");
            return Ok(hit.clone());
        }

        let vector = self.inner.embed_query(text).await?;
        cache.lock().await.put(key, vector.clone());
        Ok(vector)
    }
}
