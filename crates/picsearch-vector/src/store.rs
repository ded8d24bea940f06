//! Persistence of a `FlatL2Index` as a LanceDB dataset.
//!
//! Rows live in the `vectors` table (`id`, `vector`); the `meta` table records
//! the corpus version and dimension so a loader can reject artifacts that do
//! not belong to the corpus it is joining against.

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, UInt32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::path::Path;
use std::sync::Arc;

use picsearch_core::error::{Error, Result};
use picsearch_core::types::{CorpusVersion, DocId};

use crate::flat::FlatL2Index;
use crate::schema::{build_vectors_schema, META_CORPUS_VERSION, META_DIMENSION, META_TABLE, VECTORS_TABLE};
use crate::table::{ensure_table, get_meta, has_table, open_db, set_meta};

/// A vector index read back from disk together with its corpus version.
#[derive(Debug)]
pub struct StoredVectors {
    pub index: FlatL2Index,
    pub version: CorpusVersion,
}

fn dimension_i32(dimension: usize) -> Result<i32> {
    i32::try_from(dimension).map_err(|_| Error::Storage(format!("dimension {} does not fit an arrow list size", dimension)))
}

/// Write `index` into a fresh dataset at `db_dir` (any existing content is removed).
pub async fn save(db_dir: &Path, index: &FlatL2Index, version: &CorpusVersion) -> Result<()> {
    if db_dir.exists() {
        tokio::fs::remove_dir_all(db_dir).await?;
    }
    tokio::fs::create_dir_all(db_dir).await?;
    let conn = open_db(db_dir).await?;
    let dim = dimension_i32(index.dimension())?;
    let schema = build_vectors_schema(dim);

    if index.is_empty() {
        ensure_table(&conn, VECTORS_TABLE, schema).await?;
    } else {
        let ids: Vec<DocId> = index.iter().map(|(id, _)| id).collect();
        let vectors = index.iter().map(|(_, row)| Some(row.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(UInt32Array::from(ids)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim)),
            ],
        )
        .map_err(Error::storage)?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        conn.create_table(VECTORS_TABLE, reader).execute().await.map_err(Error::storage)?;
    }

    set_meta(&conn, META_TABLE, META_CORPUS_VERSION, version.as_str()).await?;
    set_meta(&conn, META_TABLE, META_DIMENSION, &index.dimension().to_string()).await?;
    tracing::debug!(dir = %db_dir.display(), rows = index.len(), dim = index.dimension(), "vector table written");
    Ok(())
}

/// Read a dataset written by [`save`]. Missing tables or meta, wrong
/// dimensions, and ids that are not exactly `0..n` are load errors.
pub async fn load(db_dir: &Path) -> Result<StoredVectors> {
    if !db_dir.is_dir() {
        return Err(Error::CorpusLoad(format!("{}: vector dataset not found", db_dir.display())));
    }
    let conn = open_db(db_dir).await.map_err(load_err)?;
    let version = get_meta(&conn, META_TABLE, META_CORPUS_VERSION)
        .await
        .map_err(load_err)?
        .ok_or_else(|| Error::CorpusLoad(format!("{}: vector meta has no corpus version", db_dir.display())))?;
    let dimension: usize = get_meta(&conn, META_TABLE, META_DIMENSION)
        .await
        .map_err(load_err)?
        .ok_or_else(|| Error::CorpusLoad(format!("{}: vector meta has no dimension", db_dir.display())))?
        .parse()
        .map_err(|e| Error::CorpusLoad(format!("{}: bad dimension in vector meta: {}", db_dir.display(), e)))?;
    if !has_table(&conn, VECTORS_TABLE).await.map_err(load_err)? {
        return Err(Error::CorpusLoad(format!("{}: vectors table missing", db_dir.display())));
    }

    let table = conn.open_table(VECTORS_TABLE).execute().await.map_err(|e| load_err(Error::storage(e)))?;
    let count = table.count_rows(None).await.map_err(|e| load_err(Error::storage(e)))?;
    let mut rows: Vec<(DocId, Vec<f32>)> = Vec::with_capacity(count);
    if count > 0 {
        let batches: Vec<RecordBatch> = table
            .query()
            .limit(count)
            .execute()
            .await
            .map_err(|e| load_err(Error::storage(e)))?
            .try_collect()
            .await
            .map_err(|e| load_err(Error::storage(e)))?;
        for batch in &batches {
            read_batch(batch, dimension, &mut rows)?;
        }
    }

    rows.sort_by_key(|(id, _)| *id);
    for (expected, (id, _)) in rows.iter().enumerate() {
        if *id as usize != expected {
            return Err(Error::CorpusLoad(format!("{}: vector ids are not contiguous (found {} at position {})", db_dir.display(), id, expected)));
        }
    }
    let vectors: Vec<Vec<f32>> = rows.into_iter().map(|(_, v)| v).collect();
    let index = FlatL2Index::build(dimension, &vectors).map_err(load_err)?;
    Ok(StoredVectors { index, version: CorpusVersion::new(version) })
}

fn load_err(e: Error) -> Error {
    match e {
        Error::CorpusLoad(_) => e,
        other => Error::CorpusLoad(other.to_string()),
    }
}

fn read_batch(batch: &RecordBatch, dimension: usize, rows: &mut Vec<(DocId, Vec<f32>)>) -> Result<()> {
    let ids = batch
        .column_by_name("id")
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| Error::CorpusLoad("vectors.id column missing".to_string()))?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| Error::CorpusLoad("vectors.vector column missing".to_string()))?;
    if vectors.value_length() as usize != dimension {
        return Err(Error::CorpusLoad(format!("vector column has size {}, meta says {}", vectors.value_length(), dimension)));
    }
    for i in 0..batch.num_rows() {
        if ids.is_null(i) || vectors.is_null(i) {
            return Err(Error::CorpusLoad(format!("null vector row at position {}", i)));
        }
        let values = vectors.value(i);
        let values = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| Error::CorpusLoad("vector items are not float32".to_string()))?;
        rows.push((ids.value(i), values.values().to_vec()));
    }
    Ok(())
}
