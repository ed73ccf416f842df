use async_trait::async_trait;

use crate::types::PageModel;

/// Turns text into a fixed-dimension vector.
///
/// Implementations must return vectors of length [`Embedder::dim`] for every
/// input. `id` names the provider/model; the embedding cache tags entries with
/// it and treats an entry from another id as a miss.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Authoritative source of the page/element/task/step tree.
pub trait ModelSource: Send + Sync {
    fn load_pages(&self) -> anyhow::Result<Vec<PageModel>>;
}
