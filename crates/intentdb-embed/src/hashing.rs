use std::hash::Hasher;

use anyhow::Result;
use async_trait::async_trait;
use twox_hash::XxHash64;

use intentdb_core::traits::Embedder;

use crate::similarity::normalize;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder.
///
/// Each lowercase word and each character trigram of `#word#` is hashed into
/// one of `dim` buckets with a hash-derived sign; the sum is L2-normalized.
/// Texts sharing words or word fragments land close together, which is enough
/// to exercise the vector side of the engine without a model.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut v, word.as_bytes(), WORD_WEIGHT);
            let padded: Vec<char> = std::iter::once('#')
                .chain(word.chars())
                .chain(std::iter::once('#'))
                .collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut v, gram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }
        normalize(&mut v);
        v
    }

    fn add_feature(&self, v: &mut [f32], bytes: &[u8], weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(bytes);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
