use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use intentdb_core::config::CacheConfig;
use intentdb_core::error::Error;
use intentdb_core::traits::Embedder;

use crate::cache::EmbeddingCache;

/// Wraps a provider with the on-disk [`EmbeddingCache`]. Entries are tagged
/// with the provider's [`Embedder::id`], so vectors from another provider
/// sharing the directory are never served.
///
/// Cache problems degrade to a miss; provider failures propagate unchanged
/// apart from added context.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Option<EmbeddingCache>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: EmbeddingCache) -> Self {
        Self { inner, cache: Some(cache), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn uncached(inner: Arc<dyn Embedder>) -> Self {
        Self { inner, cache: None, hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn from_config(inner: Arc<dyn Embedder>, config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(inner, EmbeddingCache::from_config(config))
        } else {
            Self::uncached(inner)
        }
    }

    pub fn cache(&self) -> Option<&EmbeddingCache> {
        self.cache.as_ref()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dim = self.inner.dim();
        let id = self.inner.id();
        if let Some(cache) = &self.cache {
            if let Some(vector) = cache.get(id, text).await {
                if vector.len() == dim {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(vector);
                }
                warn!(cached = vector.len(), expected = dim, "cached vector has wrong dimension; regenerating");
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let vector = self
            .inner
            .embed(text)
            .await
            .map_err(|e| e.context(Error::Provider(id.to_string())))?;
        if vector.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() }.into());
        }
        debug!(provider = id, text_len = text.len(), "generated embedding");

        if let Some(cache) = &self.cache {
            cache.put(id, text, &vector).await;
        }
        Ok(vector)
    }
}
