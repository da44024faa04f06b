//! Retrieval-augmented answering over a legal corpus.
//!
//! [`AnswerOrchestrator`] is the single query entry point. It is built from an
//! injected [`Embedder`](lexrag_core::traits::Embedder),
//! [`Generator`](lexrag_core::traits::Generator) and
//! [`StoreProvider`](lexrag_core::traits::StoreProvider).

pub mod confidence;
pub mod orchestrator;
pub mod prompt;
pub mod retriever;

pub use confidence::{ConfidencePolicy, HeuristicConfidence};
pub use orchestrator::AnswerOrchestrator;
pub use retriever::Retriever;
