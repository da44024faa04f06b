use arrow_array::{Array, Float32Array, Int32Array, Int64Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use lexrag_core::traits::{StoreProvider, VectorStore};
use lexrag_core::types::{DocumentChunk, SearchHit};
use lexrag_core::{Error, Result};

use crate::schema::{vector_dim, CHUNKS_TABLE, VECTOR_COLUMN};
use crate::table::{open_db, read_meta, table_exists};
use crate::{rank, CANDIDATE_FACTOR};

/// A persisted chunk store opened for similarity search.
pub struct LanceVectorStore { pub(crate) table: Table, dim: usize, path: PathBuf, meta: BTreeMap<String, String> }

impl LanceVectorStore {
	/// Open the store persisted at `path`. When `expected_dim` is given the
	/// stored vector width must match it.
	pub async fn open(path: &Path, expected_dim: Option<usize>) -> Result<Self> {
		if !path.is_dir() { return Err(Error::StoreNotFound(path.to_path_buf())); }
		let db = open_db(path).await?;
		if !table_exists(&db, CHUNKS_TABLE).await? { return Err(Error::StoreNotFound(path.to_path_buf())); }
		let table = db.open_table(CHUNKS_TABLE).execute().await.map_err(Error::store)?;
		let schema = table.schema().await.map_err(Error::store)?;
		let dim = vector_dim(&schema).ok_or_else(|| Error::Store(format!("{CHUNKS_TABLE} has no fixed-size {VECTOR_COLUMN} column")))?;
		if let Some(expected) = expected_dim {
			if expected != dim { return Err(Error::DimensionMismatch { expected, actual: dim }); }
		}
		let meta = read_meta(&db).await?;
		info!(path = %path.display(), dim, embedder = meta.get("embedder_id").map(String::as_str).unwrap_or("unknown"), "opened vector store");
		Ok(Self { table, dim, path: path.to_path_buf(), meta })
	}

	pub fn path(&self) -> &Path { &self.path }

	/// Build-time metadata (`embedder_id`, `chunk_count`, `built_at`, ...).
	pub fn meta(&self) -> &BTreeMap<String, String> { &self.meta }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	fn dim(&self) -> usize { self.dim }

	async fn count(&self) -> Result<usize> {
		self.table.count_rows(None).await.map_err(Error::store)
	}

	async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		if query.len() != self.dim { return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() }); }
		let total = self.count().await?;
		if k == 0 || total == 0 { return Ok(vec![]); }
		let limit = k.saturating_mul(CANDIDATE_FACTOR).min(total);
		let mut hits = self.nearest(query, limit).await?;
		// Lance picks arbitrarily among rows tied at the cut-off; if the window
		// ends inside a tie at the k-th score, scan everything so `seq` decides.
		if hits.len() == limit && limit < total && tied_at_cutoff(&hits, k) {
			debug!(k, limit, total, "tie crosses candidate window, widening search");
			hits = self.nearest(query, total).await?;
		}
		debug!(candidates = hits.len(), k, "vector search");
		Ok(rank(hits, k))
	}
}

impl LanceVectorStore {
	async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
		let mut stream = self.table
			.vector_search(query.to_vec()).map_err(Error::store)?
			.column(VECTOR_COLUMN)
			.distance_type(DistanceType::Cosine)
			.limit(limit)
			.execute().await.map_err(Error::store)?;
		let mut hits = Vec::with_capacity(limit);
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await.map_err(Error::store)? {
			hits.extend(batch_to_hits(&batch)?);
		}
		Ok(hits)
	}
}

/// True when the weakest fetched candidate scores the same as the k-th best,
/// i.e. rows outside the window could still tie for a top-k slot.
fn tied_at_cutoff(hits: &[SearchHit], k: usize) -> bool {
	let mut scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
	scores.sort_by(|a, b| b.total_cmp(a));
	match (scores.get(k.saturating_sub(1)), scores.last()) {
		(Some(kth), Some(weakest)) => kth == weakest,
		_ => false,
	}
}

fn col<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::Store(format!("column {name} missing or mistyped")))
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
	let ids = col::<StringArray>(batch, "id")?;
	let doc_ids = col::<StringArray>(batch, "doc_id")?;
	let source_names = col::<StringArray>(batch, "source_name")?;
	let doc_paths = col::<StringArray>(batch, "doc_path")?;
	let pages = col::<Int32Array>(batch, "page")?;
	let contents = col::<StringArray>(batch, "content")?;
	let chunk_indices = col::<Int32Array>(batch, "chunk_index")?;
	let total_chunks = col::<Int32Array>(batch, "total_chunks")?;
	let seqs = col::<Int64Array>(batch, "seq")?;
	let distances = col::<Float32Array>(batch, "_distance")?;
	let mut hits = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let id = ids.value(i).to_string();
		let distance = distances.value(i);
		if distance.is_nan() { return Err(Error::InvalidScore { chunk_id: id }); }
		let chunk = DocumentChunk {
			id,
			doc_id: doc_ids.value(i).to_string(),
			source_name: source_names.value(i).to_string(),
			doc_path: doc_paths.value(i).to_string(),
			page: if pages.is_null(i) { None } else { u32::try_from(pages.value(i)).ok() },
			content: contents.value(i).to_string(),
			chunk_index: usize::try_from(chunk_indices.value(i)).unwrap_or_default(),
			total_chunks: usize::try_from(total_chunks.value(i)).unwrap_or_default(),
		};
		hits.push(SearchHit { chunk, score: (1.0 - distance).clamp(0.0, 1.0), seq: u64::try_from(seqs.value(i)).unwrap_or_default() });
	}
	Ok(hits)
}

/// Opens the persisted store on demand; each call sees the latest build.
pub struct LanceStoreProvider { path: PathBuf, expected_dim: Option<usize> }

impl LanceStoreProvider {
	pub fn new(path: impl Into<PathBuf>, expected_dim: Option<usize>) -> Self { Self { path: path.into(), expected_dim } }
}

#[async_trait]
impl StoreProvider for LanceStoreProvider {
	async fn open(&self) -> Result<Arc<dyn VectorStore>> {
		Ok(Arc::new(LanceVectorStore::open(&self.path, self.expected_dim).await?))
	}
}
