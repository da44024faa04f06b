//! Chunk storage and exact kNN search.
//!
//! [`LanceVectorStore`] persists chunks and their embeddings in a LanceDB
//! directory; [`InMemoryVectorStore`] keeps them in process. Both rank by
//! cosine similarity with ties broken by insertion order.

pub mod index_build;
pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use index_build::{BuildReport, IndexBuilder};
pub use memory::InMemoryVectorStore;
pub use search::{LanceStoreProvider, LanceVectorStore};

use lexrag_core::types::SearchHit;

/// Candidates fetched per requested hit before the final ordering pass.
pub(crate) const CANDIDATE_FACTOR: usize = 4;

/// Descending score, then ascending `seq`; keep the first `k`.
pub(crate) fn rank(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.seq.cmp(&b.seq)));
    hits.truncate(k);
    hits
}
