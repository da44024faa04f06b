use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SearchHit;

/// Text to fixed-width vector. Implementations must be deterministic for a
/// fixed model: equal input yields bit-identical output.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Read path of a vector collection. Implementations must allow concurrent
/// `count`/`search` through a shared reference.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn dim(&self) -> usize;
    async fn count(&self) -> Result<usize>;
    /// Up to `k` hits, descending by score, ties by insertion order.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Acquires a store handle. Returns `Error::StoreNotFound` when nothing has
/// been persisted yet.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn VectorStore>>;
}

/// Prompt in, completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}
