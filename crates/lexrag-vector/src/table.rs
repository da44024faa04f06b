//! LanceDB connection and housekeeping helpers.
//!
//! Provides the database open function, table existence checks, and the
//! key/value `meta` table written once per build.

use arrow_array::{RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lexrag_core::{Error, Result};

use crate::schema::{build_meta_schema, META_TABLE};

pub async fn open_db(path: &Path) -> Result<Connection> {
    connect(path.to_string_lossy().as_ref()).execute().await.map_err(Error::store)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(Error::store)?;
    Ok(names.iter().any(|n| n == name))
}

pub async fn write_meta(conn: &Connection, entries: &BTreeMap<String, String>) -> Result<()> {
    let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
    let values: Vec<&str> = entries.values().map(String::as_str).collect();
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![Arc::new(StringArray::from(keys)), Arc::new(StringArray::from(values))],
    )
    .map_err(Error::store)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    conn.create_table(META_TABLE, reader).execute().await.map_err(Error::store)?;
    Ok(())
}

/// All meta entries; empty when the table is absent.
pub async fn read_meta(conn: &Connection) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if !table_exists(conn, META_TABLE).await? { return Ok(out); }
    let t = conn.open_table(META_TABLE).execute().await.map_err(Error::store)?;
    let mut stream = t.query().execute().await.map_err(Error::store)?;
    while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
        let key = batch.column_by_name("key").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| Error::Store("meta.key column missing".into()))?;
        let val = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| Error::Store("meta.value column missing".into()))?;
        for i in 0..batch.num_rows() { out.insert(key.value(i).to_string(), val.value(i).to_string()); }
    }
    Ok(out)
}
