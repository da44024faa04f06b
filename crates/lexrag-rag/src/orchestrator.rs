//! Per-request decision core.
//!
//! Chooses between retrieval-augmented and generation-only answering, builds
//! the prompt, calls the generator and scores confidence. The store handle is
//! the only state shared across requests.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use lexrag_core::config::Settings;
use lexrag_core::traits::{Embedder, Generator, StoreProvider, VectorStore};
use lexrag_core::types::{AnswerMode, QueryResult, RetrievalConfig, ScoredSource};
use lexrag_core::{Error, Result};

use crate::confidence::{ConfidencePolicy, HeuristicConfidence};
use crate::prompt::{generation_only_prompt, retrieval_prompt};
use crate::retriever::Retriever;

const DEFAULT_PREVIEW_CHARS: usize = 200;

#[derive(Default)]
struct Binding { initialized: bool, store: Option<Arc<dyn VectorStore>> }

pub struct AnswerOrchestrator {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    provider: Arc<dyn StoreProvider>,
    policy: Arc<dyn ConfidencePolicy>,
    binding: RwLock<Binding>,
}

impl AnswerOrchestrator {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>, provider: Arc<dyn StoreProvider>) -> Self {
        Self {
            retriever: Retriever::new(embedder, DEFAULT_PREVIEW_CHARS),
            generator,
            provider,
            policy: Arc::new(HeuristicConfidence::default()),
            binding: RwLock::new(Binding::default()),
        }
    }

    /// Preview length and confidence constants taken from `settings`.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>, provider: Arc<dyn StoreProvider>) -> Self {
        Self::new(embedder, generator, provider)
            .with_preview_chars(settings.retrieval.preview_chars)
            .with_policy(Arc::new(HeuristicConfidence::from_settings(&settings.confidence)))
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.retriever = Retriever::new(Arc::clone(self.retriever.embedder()), preview_chars);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ConfidencePolicy>) -> Self { self.policy = policy; self }

    /// Acquire the store once. A missing store leaves the orchestrator ready in
    /// generation-only mode; any other provider error is returned.
    pub async fn initialize(&self) -> Result<()> {
        if self.binding.read().await.initialized { return Ok(()); }
        let mut binding = self.binding.write().await;
        if binding.initialized { return Ok(()); }
        binding.store = self.acquire().await?;
        binding.initialized = true;
        Ok(())
    }

    pub async fn is_ready(&self) -> bool { self.binding.read().await.initialized }

    /// Drop the current store handle and acquire a new one. On error the
    /// previous handle stays bound. In-flight requests keep the handle they
    /// started with.
    pub async fn refresh(&self) -> Result<()> {
        let store = self.acquire().await?;
        let mut binding = self.binding.write().await;
        binding.store = store;
        binding.initialized = true;
        info!("vector store handle refreshed");
        Ok(())
    }

    async fn acquire(&self) -> Result<Option<Arc<dyn VectorStore>>> {
        match self.provider.open().await {
            Ok(store) => {
                info!(dim = store.dim(), "vector store bound");
                Ok(Some(store))
            }
            Err(Error::StoreNotFound(path)) => {
                warn!(path = %path.display(), "no vector store found, answering in generation-only mode");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn current_store(&self) -> Option<Arc<dyn VectorStore>> { self.binding.read().await.store.clone() }

    /// Mode the next request would start in. A store that cannot be counted
    /// is treated like an empty one, as `answer` would.
    pub async fn mode(&self) -> Result<AnswerMode> {
        self.initialize().await?;
        let populated = match self.current_store().await {
            Some(store) => match store.count().await {
                Ok(count) => count > 0,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "could not count vector store, reporting generation-only mode");
                    false
                }
            },
            None => false,
        };
        Ok(if populated { AnswerMode::RetrievalAugmented } else { AnswerMode::GenerationOnly })
    }

    pub async fn answer(&self, query: &str, config: &RetrievalConfig) -> Result<QueryResult> {
        self.initialize().await?;
        let sources = match self.current_store().await {
            Some(store) => self.retrieve_or_fallback(store.as_ref(), query, config).await?,
            None => vec![],
        };
        let (prompt, mode) = if sources.is_empty() {
            (generation_only_prompt(query), AnswerMode::GenerationOnly)
        } else {
            (retrieval_prompt(query, &sources), AnswerMode::RetrievalAugmented)
        };
        debug!(?mode, sources = sources.len(), generator = self.generator.name(), "generating answer");
        let answer = self.generator.generate(&prompt).await.map_err(|e| Error::GenerationFailed(e.to_string()))?;
        let confidence = self.policy.score(&sources).clamp(0.0, 1.0);
        Ok(QueryResult { answer, sources, confidence, mode })
    }

    /// Retrieval failures fall back to no sources, except internal
    /// consistency errors.
    async fn retrieve_or_fallback(&self, store: &dyn VectorStore, query: &str, config: &RetrievalConfig) -> Result<Vec<ScoredSource>> {
        match self.retriever.retrieve(store, query, config).await {
            Ok(sources) => Ok(sources),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "retrieval failed, falling back to generation-only prompt");
                Ok(vec![])
            }
        }
    }
}
