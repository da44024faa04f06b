use std::sync::Arc;
use tracing::debug;

use lexrag_core::traits::{Embedder, VectorStore};
use lexrag_core::types::{RetrievalConfig, ScoredSource};
use lexrag_core::{Error, Result};

/// Query embedding plus thresholded top-k search.
pub struct Retriever { embedder: Arc<dyn Embedder>, preview_chars: usize }

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, preview_chars: usize) -> Self { Self { embedder, preview_chars } }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Runs the embedder on the blocking pool.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
    }

    /// Sources scoring at least `config.min_score`, best first. An empty store
    /// yields an empty list without embedding the query.
    pub async fn retrieve(&self, store: &dyn VectorStore, query: &str, config: &RetrievalConfig) -> Result<Vec<ScoredSource>> {
        if store.count().await? == 0 { return Ok(vec![]); }
        let vector = self.embed_query(query).await?;
        let hits = store.search(&vector, config.top_k).await?;
        let found = hits.len();
        let sources: Vec<ScoredSource> = hits
            .into_iter()
            .filter(|h| h.score >= config.min_score)
            .map(|h| ScoredSource {
                preview: preview(&h.chunk.content, self.preview_chars),
                chunk_id: h.chunk.id,
                source_name: h.chunk.source_name,
                page: h.chunk.page,
                score: h.score,
            })
            .collect();
        debug!(found, kept = sources.len(), min_score = config.min_score, "retrieved sources");
        Ok(sources)
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("Duty of care.", 200), "Duty of care.");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("§§§§", 2), "§§...");
    }
}
