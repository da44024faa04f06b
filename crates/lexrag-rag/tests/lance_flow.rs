mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use common::RecordingGenerator;
use lexrag_core::data_processor::DataProcessor;
use lexrag_core::traits::{Embedder, VectorStore};
use lexrag_core::types::{AnswerMode, RetrievalConfig};
use lexrag_core::Error;
use lexrag_embed::HashEmbedder;
use lexrag_rag::AnswerOrchestrator;
use lexrag_vector::{LanceStoreProvider, LanceVectorStore};

const DIM: usize = 384;
const CONSIDERATION: &str = "Consideration is something of value given in exchange for a promise. Past consideration is generally not good consideration.";

fn corpus_dir() -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
    root.join("test_data/corpus")
}

fn embedder() -> Arc<dyn Embedder> { Arc::new(HashEmbedder::new(DIM).unwrap()) }

async fn build(persist: &Path) {
    let (store, report) = LanceVectorStore::build(&corpus_dir(), persist, embedder(), DataProcessor::new()).await.unwrap();
    assert_eq!(report.chunks, 10);
    assert_eq!(store.count().await.unwrap(), 10);
}

fn orchestrator(persist: &Path, expected_dim: Option<usize>, generator: Arc<RecordingGenerator>) -> AnswerOrchestrator {
    AnswerOrchestrator::new(embedder(), generator, Arc::new(LanceStoreProvider::new(persist, expected_dim)))
}

#[tokio::test]
async fn persisted_store_grounds_the_answer() {
    let tmp = TempDir::new().unwrap();
    let persist = tmp.path().join("store");
    build(&persist).await;

    let generator = Arc::new(RecordingGenerator::answering("Consideration must be bargained for."));
    let orch = orchestrator(&persist, Some(DIM), generator.clone());
    assert_eq!(orch.mode().await.unwrap(), AnswerMode::RetrievalAugmented);

    let result = orch.answer(CONSIDERATION, &RetrievalConfig::new(3, 0.3).unwrap()).await.unwrap();
    assert_eq!(result.mode, AnswerMode::RetrievalAugmented);
    assert_eq!(result.sources[0].chunk_id, "contracts/formation.md:4");
    assert!(result.sources[0].score > 0.99, "score {}", result.sources[0].score);
    assert!(result.sources.iter().all(|s| s.score >= 0.3));
    assert!(result.confidence > 0.9);
    assert!(generator.last_prompt().contains("[Source 1: formation.md]"));
}

#[tokio::test]
async fn unreachable_threshold_falls_back_to_generation_only() {
    let tmp = TempDir::new().unwrap();
    let persist = tmp.path().join("store");
    build(&persist).await;

    let generator = Arc::new(RecordingGenerator::answering("An answer."));
    let orch = orchestrator(&persist, Some(DIM), generator.clone());
    let result = orch.answer("What does a plaintiff prove in negligence?", &RetrievalConfig::new(3, 1.0).unwrap()).await.unwrap();
    assert_eq!(result.mode, AnswerMode::GenerationOnly);
    assert!(result.sources.is_empty());
    assert!((result.confidence - 0.8).abs() < f32::EPSILON);
    assert!(!generator.last_prompt().contains("[Source"));
}

#[tokio::test]
async fn store_built_with_another_width_fails_initialization() {
    let tmp = TempDir::new().unwrap();
    let persist = tmp.path().join("store");
    build(&persist).await;

    let orch = orchestrator(&persist, Some(128), Arc::new(RecordingGenerator::answering("ok")));
    let err = orch.initialize().await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 128, actual: DIM }), "got {err:?}");
    assert!(!orch.is_ready().await);
}

#[tokio::test]
async fn missing_persist_dir_answers_generation_only() {
    let tmp = TempDir::new().unwrap();
    let orch = orchestrator(&tmp.path().join("never-built"), Some(DIM), Arc::new(RecordingGenerator::answering("ok")));
    orch.initialize().await.unwrap();
    assert!(orch.is_ready().await);
    assert_eq!(orch.mode().await.unwrap(), AnswerMode::GenerationOnly);
}
