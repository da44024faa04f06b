//! Brute-force in-process store.
//!
//! Same ranking contract as the LanceDB store; used by tests and by callers
//! that index a handful of chunks without touching disk.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use lexrag_core::traits::VectorStore;
use lexrag_core::types::{DocumentChunk, SearchHit};
use lexrag_core::{Error, Result};

use crate::rank;

struct Record { chunk: DocumentChunk, vector: Vec<f32> }

#[derive(Default)]
struct Inner { records: Vec<Record>, ids: HashSet<String> }

pub struct InMemoryVectorStore { dim: usize, inner: RwLock<Inner> }

/// Cosine similarity; 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 { return 0.0; }
    dot / (norm_a * norm_b)
}

impl InMemoryVectorStore {
    pub fn new(dim: usize) -> Self { Self { dim, inner: RwLock::new(Inner::default()) } }

    pub async fn from_records(dim: usize, records: Vec<(DocumentChunk, Vec<f32>)>) -> Result<Self> {
        let store = Self::new(dim);
        store.insert_many(records).await?;
        Ok(store)
    }

    pub async fn insert(&self, chunk: DocumentChunk, vector: Vec<f32>) -> Result<()> {
        self.insert_many(vec![(chunk, vector)]).await
    }

    /// All-or-nothing: a duplicate id or a wrong-width vector rejects the whole batch.
    pub async fn insert_many(&self, records: Vec<(DocumentChunk, Vec<f32>)>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let mut incoming = HashSet::new();
        for (chunk, vector) in &records {
            if vector.len() != self.dim { return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() }); }
            if inner.ids.contains(&chunk.id) || !incoming.insert(chunk.id.clone()) {
                return Err(Error::DuplicateChunk(chunk.id.clone()));
            }
        }
        inner.ids.extend(incoming);
        inner.records.extend(records.into_iter().map(|(chunk, vector)| Record { chunk, vector }));
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dim(&self) -> usize { self.dim }

    async fn count(&self) -> Result<usize> { Ok(self.inner.read().await.records.len()) }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim { return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() }); }
        let inner = self.inner.read().await;
        let mut hits = Vec::with_capacity(inner.records.len());
        for (seq, record) in inner.records.iter().enumerate() {
            let score = cosine_similarity(&record.vector, query);
            if score.is_nan() { return Err(Error::InvalidScore { chunk_id: record.chunk.id.clone() }); }
            hits.push(SearchHit { chunk: record.chunk.clone(), score: score.clamp(0.0, 1.0), seq: seq as u64 });
        }
        Ok(rank(hits, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> DocumentChunk {
        DocumentChunk {
            id: id.into(), doc_id: "d.txt".into(), source_name: "d.txt".into(), doc_path: "/c/d.txt".into(),
            page: None, content: format!("content {id}"), chunk_index: 0, total_chunks: 1,
        }
    }

    #[tokio::test]
    async fn ties_resolve_by_insertion_order() {
        let store = InMemoryVectorStore::from_records(2, vec![
            (chunk("b"), vec![1.0, 0.0]),
            (chunk("a"), vec![2.0, 0.0]),
            (chunk("c"), vec![0.0, 1.0]),
        ]).await.unwrap();
        let hits = store.search(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
        assert_eq!(hits[2].score, 0.0);
    }

    #[tokio::test]
    async fn duplicate_id_rejects_batch() {
        let store = InMemoryVectorStore::new(2);
        let err = store.insert_many(vec![(chunk("x"), vec![1.0, 0.0]), (chunk("x"), vec![0.0, 1.0])]).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateChunk(id) if id == "x"));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn nan_vector_is_invalid_score() {
        let store = InMemoryVectorStore::from_records(2, vec![(chunk("n"), vec![f32::NAN, 1.0])]).await.unwrap();
        let err = store.search(&[1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidScore { .. }));
    }

    #[tokio::test]
    async fn wrong_query_width_is_dimension_mismatch() {
        let store = InMemoryVectorStore::new(3);
        let err = store.search(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));
    }
}
