//! Build mode: source directory in, persisted chunk store out.
//!
//! Flow:
//! 1) Walk and chunk the source corpus
//! 2) Embed in batches on the blocking pool, appending to `<persist>.staging`
//! 3) Write the `meta` table, then swap staging into place
//!
//! A failed build removes the staging directory and leaves the previous store
//! as it was.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use lexrag_core::data_processor::DataProcessor;
use lexrag_core::traits::Embedder;
use lexrag_core::types::DocumentChunk;
use lexrag_core::{Error, Result};

use crate::schema::CHUNKS_TABLE;
use crate::search::LanceVectorStore;
use crate::table::write_meta;
use crate::writer::ChunkWriter;

const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Source documents that produced at least one chunk.
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub elapsed: Duration,
}

pub struct IndexBuilder { embedder: Arc<dyn Embedder>, processor: DataProcessor, batch_size: usize, limit: Option<usize> }

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, processor: DataProcessor) -> Self {
        Self { embedder, processor, batch_size: DEFAULT_BATCH_SIZE, limit: None }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self { self.batch_size = batch_size.max(1); self }

    /// Index only the first `limit` source files (sorted by path).
    pub fn with_limit(mut self, limit: Option<usize>) -> Self { self.limit = limit; self }

    pub async fn build(&self, source: &Path, persist: &Path) -> Result<BuildReport> {
        let start = Instant::now();
        let chunks = match self.limit {
            Some(limit) => self.processor.process_directory_limited(source, limit)?,
            None => self.processor.process_directory(source)?,
        };
        let documents = chunks.iter().map(|c| c.doc_id.as_str()).collect::<HashSet<_>>().len();
        let mut meta = BTreeMap::new();
        meta.insert("source_dir".to_string(), source.display().to_string());
        meta.insert("chunk_max_tokens".to_string(), self.processor.chunking_config().max_tokens.to_string());
        meta.insert("chunk_overlap_percent".to_string(), self.processor.chunking_config().overlap_percent.to_string());
        let count = build_store(&self.embedder, &chunks, persist, self.batch_size, meta).await?;
        let report = BuildReport { documents, chunks: count, dimension: self.embedder.dim(), elapsed: start.elapsed() };
        info!(documents, chunks = count, dim = report.dimension, secs = report.elapsed.as_secs_f64(), "vector store built");
        Ok(report)
    }
}

impl LanceVectorStore {
    /// Build mode: chunk and embed everything under `source` into `persist`,
    /// replacing any previous store there, then open the result.
    pub async fn build(source: &Path, persist: &Path, embedder: Arc<dyn Embedder>, processor: DataProcessor) -> Result<(Self, BuildReport)> {
        let dim = embedder.dim();
        let report = IndexBuilder::new(embedder, processor).build(source, persist).await?;
        Ok((Self::open(persist, Some(dim)).await?, report))
    }

    /// Build mode over chunks that are already in memory.
    pub async fn build_from_chunks(persist: &Path, chunks: &[DocumentChunk], embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dim = embedder.dim();
        build_store(&embedder, chunks, persist, DEFAULT_BATCH_SIZE, BTreeMap::new()).await?;
        Self::open(persist, Some(dim)).await
    }
}

fn sibling(persist: &Path, suffix: &str) -> PathBuf {
    let name = persist.file_name().map_or_else(|| "store".to_string(), |n| n.to_string_lossy().to_string());
    persist.with_file_name(format!("{name}.{suffix}"))
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() { fs::remove_dir_all(path)?; }
    Ok(())
}

async fn build_store(embedder: &Arc<dyn Embedder>, chunks: &[DocumentChunk], persist: &Path, batch_size: usize, mut meta: BTreeMap<String, String>) -> Result<usize> {
    let mut seen = HashSet::with_capacity(chunks.len());
    if let Some(dup) = chunks.iter().find(|c| !seen.insert(c.id.as_str())) {
        return Err(Error::DuplicateChunk(dup.id.clone()));
    }
    if let Some(parent) = persist.parent().filter(|p| !p.as_os_str().is_empty()) { fs::create_dir_all(parent)?; }
    let staging = sibling(persist, "staging");
    remove_dir_if_exists(&staging)?;

    meta.insert("embedder_id".to_string(), embedder.id().to_string());
    meta.insert("dimension".to_string(), embedder.dim().to_string());
    meta.insert("chunk_count".to_string(), chunks.len().to_string());
    meta.insert("built_at".to_string(), chrono::Utc::now().to_rfc3339());

    let outcome = async {
        let written = write_staging(embedder, chunks, &staging, batch_size, &meta).await?;
        swap_into_place(&staging, persist)?;
        Ok::<_, Error>(written)
    }.await;
    if outcome.is_err() {
        if let Err(cleanup) = remove_dir_if_exists(&staging) {
            warn!(dir = %staging.display(), error = %cleanup, "failed to remove staging directory");
        }
    }
    outcome
}

async fn write_staging(embedder: &Arc<dyn Embedder>, chunks: &[DocumentChunk], staging: &Path, batch_size: usize, meta: &BTreeMap<String, String>) -> Result<usize> {
    info!(chunks = chunks.len(), dir = %staging.display(), "writing vector store");
    let mut writer = ChunkWriter::create(staging, CHUNKS_TABLE, embedder.dim()).await?;
    let pb = ProgressBar::new(chunks.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let model = Arc::clone(embedder);
        let embeddings = tokio::task::spawn_blocking(move || model.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;
        writer.write(batch, &embeddings).await?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    write_meta(&writer.db, meta).await?;
    Ok(writer.written())
}

/// `persist` -> `persist.previous`, `staging` -> `persist`, then drop the
/// previous store. If the second rename fails the previous store is put back.
/// Once staging is live the build has succeeded; a leftover previous store is
/// only logged.
fn swap_into_place(staging: &Path, persist: &Path) -> Result<()> {
    let previous = sibling(persist, "previous");
    remove_dir_if_exists(&previous)?;
    let had_previous = persist.exists();
    if had_previous { fs::rename(persist, &previous)?; }
    if let Err(e) = fs::rename(staging, persist) {
        if had_previous { fs::rename(&previous, persist)?; }
        return Err(e.into());
    }
    if had_previous {
        if let Err(e) = remove_dir_if_exists(&previous) {
            warn!(dir = %previous.display(), error = %e, "new store is live but the previous one could not be removed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_dir(path: &Path, marker: &str) {
        fs::create_dir_all(path).unwrap();
        fs::write(path.join("marker"), marker).unwrap();
    }

    #[test]
    fn swap_replaces_the_live_store() {
        let tmp = TempDir::new().unwrap();
        let persist = tmp.path().join("store");
        store_dir(&persist, "old");
        store_dir(&sibling(&persist, "staging"), "new");

        swap_into_place(&sibling(&persist, "staging"), &persist).unwrap();
        assert_eq!(fs::read_to_string(persist.join("marker")).unwrap(), "new");
        assert!(!sibling(&persist, "staging").exists());
        assert!(!sibling(&persist, "previous").exists());
    }

    #[test]
    fn failed_swap_restores_the_previous_store() {
        let tmp = TempDir::new().unwrap();
        let persist = tmp.path().join("store");
        store_dir(&persist, "old");

        let err = swap_into_place(&sibling(&persist, "staging"), &persist).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got {err:?}");
        assert_eq!(fs::read_to_string(persist.join("marker")).unwrap(), "old");
        assert!(!sibling(&persist, "previous").exists());
    }

    #[test]
    fn swap_into_an_empty_location() {
        let tmp = TempDir::new().unwrap();
        let persist = tmp.path().join("store");
        store_dir(&sibling(&persist, "staging"), "new");
        swap_into_place(&sibling(&persist, "staging"), &persist).unwrap();
        assert_eq!(fs::read_to_string(persist.join("marker")).unwrap(), "new");
    }
}
