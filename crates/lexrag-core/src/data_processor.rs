//! Document source loading and chunking.
//!
//! Policy, applied uniformly across a corpus: split each page on blank lines;
//! a paragraph whose estimated token count exceeds `max_tokens` is cut into
//! word windows of `max_tokens * 0.75` words that overlap by
//! `overlap_percent`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::DocumentChunk;

const WORDS_PER_TOKEN: f32 = 0.75;
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_percent: 0.2 }
    }
}

/// One page of extracted text. Plain-text sources have a single page with
/// `number == None`.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub number: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub doc_id: String,
    pub source_name: String,
    pub path: PathBuf,
    pub pages: Vec<SourcePage>,
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn chunking_config(&self) -> &ChunkingConfig { &self.chunking_config }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        self.process_files(data_dir, self.list_source_files(data_dir)?)
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentChunk>> {
        let mut files = self.list_source_files(data_dir)?;
        if files.len() > limit { files.truncate(limit); info!(limit, "limited to first files"); }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<DocumentChunk>> {
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no source documents found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let document = self.load_document(file_path, data_dir)?;
            all_chunks.extend(self.chunk_document(&document));
        }
        info!(files = files.len(), chunks = all_chunks.len(), "processed source documents");
        Ok(all_chunks)
    }

    pub fn load_document(&self, file_path: &Path, data_dir: &Path) -> Result<SourceDocument> {
        let pages = match extension(file_path).as_deref() {
            Some("pdf") => read_pdf_pages(file_path)?,
            _ => vec![SourcePage { number: None, text: read_text_lossy(file_path)? }],
        };
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        let doc_id = relative_path.to_string_lossy().replace('\\', "/");
        let source_name = file_path
            .file_name()
            .map_or_else(|| doc_id.clone(), |n| n.to_string_lossy().to_string());
        Ok(SourceDocument { doc_id, source_name, path: file_path.to_path_buf(), pages })
    }

    pub fn chunk_document(&self, document: &SourceDocument) -> Vec<DocumentChunk> {
        let mut document_chunks = Vec::new();
        let mut chunk_index = 0;
        for page in &document.pages {
            for content in self.chunk_text(&page.text) {
                document_chunks.push(DocumentChunk {
                    id: format!("{}:{}", document.doc_id, chunk_index),
                    doc_id: document.doc_id.clone(),
                    source_name: document.source_name.clone(),
                    doc_path: document.path.to_string_lossy().to_string(),
                    page: page.number,
                    content,
                    chunk_index,
                    total_chunks: 0,
                });
                chunk_index += 1;
            }
        }
        let total_chunks = document_chunks.len();
        for chunk in &mut document_chunks { chunk.total_chunks = total_chunks; }
        document_chunks
    }

    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() { continue; }
            if count_tokens(paragraph) <= self.chunking_config.max_tokens {
                chunks.push(paragraph.to_string());
            } else {
                chunks.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        chunks
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = ((self.chunking_config.max_tokens as f32 * WORDS_PER_TOKEN) as usize).max(1);
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize).min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_source_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(Error::Source(format!("source directory {} does not exist", root.display())));
        }
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str())) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn count_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / WORDS_PER_TOKEN) as usize
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

fn read_text_lossy(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)
        .map_err(|e| Error::Source(format!("failed to read {}: {}", file_path.display(), e)))?;
    Ok(match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).to_string(),
    })
}

#[cfg(feature = "pdf")]
fn read_pdf_pages(file_path: &Path) -> Result<Vec<SourcePage>> {
    let bytes = fs::read(file_path)
        .map_err(|e| Error::Source(format!("failed to read {}: {}", file_path.display(), e)))?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| Error::Source(format!("failed to extract {}: {}", file_path.display(), e)))?;
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| SourcePage { number: Some(u32::try_from(i + 1).unwrap_or(u32::MAX)), text })
        .collect())
}

#[cfg(not(feature = "pdf"))]
fn read_pdf_pages(file_path: &Path) -> Result<Vec<SourcePage>> {
    Err(Error::Source(format!("{}: PDF support is disabled (enable the `pdf` feature)", file_path.display())))
}
