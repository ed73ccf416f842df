//! Vector side of the engine: the on-disk embedding cache, the cache-aware
//! provider wrapper and the in-memory embedding index.
pub mod cache;
pub mod embed_provider;
pub mod index;

pub use cache::{CacheEntry, CacheStatistics, EmbeddingCache};
pub use embed_provider::cached::CachedEmbedder;
pub use index::EmbeddingIndex;
