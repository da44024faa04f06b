use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;

use lexrag_core::types::DocumentChunk;
use lexrag_core::{Error, Result};

use crate::schema::build_chunk_schema;
use crate::table::open_db;

fn hash_content(s: &str) -> String { blake3::hash(s.as_bytes()).to_hex().to_string() }

fn to_i32(v: usize, what: &str) -> Result<i32> {
	i32::try_from(v).map_err(|_| Error::Store(format!("{what} {v} does not fit the chunk schema")))
}

/// Appends embedded chunks to a freshly created chunk table, assigning
/// insertion ordinals (`seq`) in write order.
pub struct ChunkWriter { pub(crate) db: Connection, table_name: String, dim: usize, next_seq: i64 }

impl ChunkWriter {
	/// Creates the (empty) table so that a corpus with no chunks still yields
	/// a loadable store.
	pub async fn create(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let db = open_db(db_path).await?;
		let schema = build_chunk_schema(to_i32(dim, "dimension")?);
		db.create_empty_table(table_name, schema).execute().await.map_err(Error::store)?;
		Ok(Self { db, table_name: table_name.to_string(), dim, next_seq: 0 })
	}

	pub fn written(&self) -> usize { usize::try_from(self.next_seq).unwrap_or(usize::MAX) }

	pub async fn write(&mut self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
		if chunks.is_empty() { return Ok(()); }
		if chunks.len() != embeddings.len() {
			return Err(Error::Store(format!("{} chunks but {} embeddings", chunks.len(), embeddings.len())));
		}
		if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim) {
			return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
		}
		let record_batch = self.to_record_batch(chunks, embeddings)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		self.db.open_table(&self.table_name).execute().await.map_err(Error::store)?
			.add(reader).execute().await.map_err(Error::store)?;
		self.next_seq += i64::try_from(chunks.len()).map_err(Error::store)?;
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		let dim = to_i32(self.dim, "dimension")?;
		let schema = build_chunk_schema(dim);
		let mut ids = Vec::new(); let mut doc_ids = Vec::new(); let mut source_names = Vec::new(); let mut doc_paths = Vec::new();
		let mut pages = Vec::new(); let mut contents = Vec::new(); let mut hashes = Vec::new();
		let mut chunk_indices = Vec::new(); let mut total_chunks = Vec::new(); let mut seqs = Vec::new();
		let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
		for (offset, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
			ids.push(chunk.id.clone()); doc_ids.push(chunk.doc_id.clone()); source_names.push(chunk.source_name.clone()); doc_paths.push(chunk.doc_path.clone());
			pages.push(chunk.page.map(|p| i32::try_from(p).unwrap_or(i32::MAX)));
			contents.push(chunk.content.clone()); hashes.push(hash_content(&chunk.content));
			chunk_indices.push(to_i32(chunk.chunk_index, "chunk_index")?); total_chunks.push(to_i32(chunk.total_chunks, "total_chunks")?);
			seqs.push(self.next_seq + i64::try_from(offset).map_err(Error::store)?);
			vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
		}
		RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(doc_ids)),
			Arc::new(StringArray::from(source_names)),
			Arc::new(StringArray::from(doc_paths)),
			Arc::new(Int32Array::from(pages)),
			Arc::new(StringArray::from(contents)),
			Arc::new(StringArray::from(hashes)),
			Arc::new(Int32Array::from(chunk_indices)),
			Arc::new(Int32Array::from(total_chunks)),
			Arc::new(Int64Array::from(seqs)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
		]).map_err(Error::store)
	}
}
