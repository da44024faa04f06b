#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lexrag_core::traits::{Embedder, Generator, StoreProvider, VectorStore};
use lexrag_core::types::{DocumentChunk, SearchHit};
use lexrag_core::{Error, Result};
use lexrag_vector::InMemoryVectorStore;

/// Returns a scripted vector per text, `fallback` for anything else.
pub struct ScriptedEmbedder { dim: usize, vectors: HashMap<String, Vec<f32>>, fallback: Vec<f32> }

impl ScriptedEmbedder {
    pub fn constant(vector: Vec<f32>) -> Self { Self { dim: vector.len(), vectors: HashMap::new(), fallback: vector } }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self { self.vectors.insert(text.to_string(), vector); self }
}

impl Embedder for ScriptedEmbedder {
    fn id(&self) -> &str { "scripted" }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Records every prompt; answers with a canned string or fails.
pub struct RecordingGenerator { answer: Option<String>, pub prompts: Mutex<Vec<String>> }

impl RecordingGenerator {
    pub fn answering(answer: &str) -> Self { Self { answer: Some(answer.to_string()), prompts: Mutex::new(vec![]) } }
    pub fn failing() -> Self { Self { answer: None, prompts: Mutex::new(vec![]) } }
    pub fn last_prompt(&self) -> String { self.prompts.lock().unwrap().last().cloned().unwrap_or_default() }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn name(&self) -> &str { "recording" }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone().ok_or_else(|| Error::GenerationUnavailable("connection refused".into()))
    }
}

/// Hands out whatever store is currently set; `None` means nothing persisted.
pub struct SwappableProvider { store: Mutex<Option<Arc<dyn VectorStore>>>, opens: AtomicUsize }

impl SwappableProvider {
    pub fn new(store: Option<Arc<dyn VectorStore>>) -> Self { Self { store: Mutex::new(store), opens: AtomicUsize::new(0) } }
    pub fn set(&self, store: Option<Arc<dyn VectorStore>>) { *self.store.lock().unwrap() = store; }
    pub fn opens(&self) -> usize { self.opens.load(Ordering::SeqCst) }
}

#[async_trait]
impl StoreProvider for SwappableProvider {
    async fn open(&self) -> Result<Arc<dyn VectorStore>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.store.lock().unwrap().clone().ok_or_else(|| Error::StoreNotFound(PathBuf::from("/stores/legal")))
    }
}

/// Provider whose backend is broken.
pub struct BrokenProvider;

#[async_trait]
impl StoreProvider for BrokenProvider {
    async fn open(&self) -> Result<Arc<dyn VectorStore>> { Err(Error::Store("corrupt manifest".into())) }
}

/// Store whose reads fail with a fixed error.
pub struct FailingStore { pub dim: usize, pub error: fn() -> Error }

#[async_trait]
impl VectorStore for FailingStore {
    fn dim(&self) -> usize { self.dim }
    async fn count(&self) -> Result<usize> { Ok(1) }
    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<SearchHit>> { Err((self.error)()) }
}

/// Store that cannot even report its size.
pub struct UncountableStore { pub dim: usize }

#[async_trait]
impl VectorStore for UncountableStore {
    fn dim(&self) -> usize { self.dim }
    async fn count(&self) -> Result<usize> { Err(Error::Store("table handle closed".into())) }
    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<SearchHit>> { Err(Error::Store("table handle closed".into())) }
}

pub fn chunk(doc: &str, index: usize, content: &str, page: Option<u32>) -> DocumentChunk {
    DocumentChunk {
        id: format!("{doc}:{index}"),
        doc_id: doc.to_string(),
        source_name: doc.rsplit('/').next().unwrap_or(doc).to_string(),
        doc_path: format!("/corpus/{doc}"),
        page,
        content: content.to_string(),
        chunk_index: index,
        total_chunks: index + 1,
    }
}

pub async fn memory_store(dim: usize, records: Vec<(DocumentChunk, Vec<f32>)>) -> Arc<dyn VectorStore> {
    Arc::new(InMemoryVectorStore::from_records(dim, records).await.unwrap())
}
