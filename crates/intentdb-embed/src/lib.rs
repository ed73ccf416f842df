//! Vector math and the built-in local embedding provider.
//!
//! `similarity` holds the cosine calculator used when ranking. `hashing`
//! provides a deterministic feature-hashing [`Embedder`] for development, tests
//! and offline use; real deployments plug in their own provider.
use std::sync::Arc;

use anyhow::Result;
use intentdb_core::config::EmbeddingConfig;
use intentdb_core::error::Error;
use intentdb_core::traits::Embedder;

pub mod hashing;
pub mod similarity;

pub use hashing::HashEmbedder;
pub use similarity::{cosine_similarity, try_cosine_similarity};

/// Builds the provider named by `embedding.provider`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing provider regardless.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!(dim = config.dimension, "using hashing embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Arc::new(HashEmbedder::new(config.dimension)));
    }
    match config.provider.as_str() {
        "hash" | "local" => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        other => Err(Error::InvalidConfig(format!("unknown embedding provider '{other}'")).into()),
    }
}
