//! Domain types shared by the store, retriever and orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ChunkId = String;

/// A chunk of a source document that is independently embedded and stored.
///
/// - `id`: `"<doc_id>:<chunk_index>"`, unique across a corpus
/// - `doc_id`: path of the source file relative to the corpus root
/// - `source_name`: file name shown in citations
/// - `doc_path`: original path to the source file
/// - `page`: 1-based page for paginated sources, `None` otherwise
/// - `content`: the text payload of the chunk
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub source_name: String,
    pub doc_path: String,
    pub page: Option<u32>,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A store-level search result.
///
/// `score` is a cosine similarity clamped to `[0, 1]`; `seq` is the chunk's
/// insertion ordinal and breaks score ties (lower wins).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
    pub seq: u64,
}

/// A citation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSource {
    pub chunk_id: ChunkId,
    pub source_name: String,
    pub page: Option<u32>,
    pub preview: String,
    pub score: f32,
}

/// Which prompt shape produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    RetrievalAugmented,
    GenerationOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<ScoredSource>,
    pub confidence: f32,
    pub mode: AnswerMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
}

impl RetrievalConfig {
    pub fn new(top_k: usize, min_score: f32) -> Result<Self> {
        if top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&min_score) {
            return Err(Error::InvalidConfig(format!("min_score must lie in [0, 1], got {min_score}")));
        }
        Ok(Self { top_k, min_score })
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self { Self { top_k: 3, min_score: 0.3 } }
}
