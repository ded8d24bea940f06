//! Corpus Store: the persisted `id -> {path, caption, tokens}` table.
//!
//! One JSON file per generation. Saving goes through a temporary file in the
//! same directory followed by a rename, so a reader never sees a partial file.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::types::{CorpusVersion, DocId, Document, DocumentMeta};

pub const CORPUS_FILE: &str = "corpus.json";

#[derive(Debug, Serialize, Deserialize)]
struct CorpusFile {
    version: CorpusVersion,
    image_root: PathBuf,
    dimension: usize,
    documents: Vec<CorpusRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CorpusRow {
    id: DocId,
    #[serde(flatten)]
    meta: DocumentMeta,
}

/// Loaded, validated corpus table. Rows are stored by id, which is contiguous from 0.
#[derive(Debug, Clone)]
pub struct CorpusTable {
    version: CorpusVersion,
    image_root: PathBuf,
    dimension: usize,
    rows: Vec<DocumentMeta>,
}

impl CorpusTable {
    pub fn version(&self) -> &CorpusVersion { &self.version }
    pub fn dimension(&self) -> usize { self.dimension }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get(&self, id: DocId) -> Option<&DocumentMeta> { self.rows.get(id as usize) }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &DocumentMeta)> {
        self.rows.iter().enumerate().map(|(i, m)| (i as DocId, m))
    }

    /// Absolute (root-joined) location of a stored relative path.
    pub fn resolve(&self, path: &str) -> PathBuf { self.image_root.join(path) }
}

pub struct CorpusStore;

impl CorpusStore {
    /// Write all documents to `dir/corpus.json`. `documents` must be in id order.
    pub fn save(dir: &Path, version: &CorpusVersion, image_root: &Path, dimension: usize, documents: &[Document]) -> Result<PathBuf> {
        for (expected, doc) in documents.iter().enumerate() {
            if doc.id as usize != expected {
                return Err(Error::Storage(format!("document ids must be contiguous: expected {}, found {}", expected, doc.id)));
            }
        }
        let file = CorpusFile {
            version: version.clone(),
            image_root: image_root.to_path_buf(),
            dimension,
            documents: documents.iter().map(|d| CorpusRow { id: d.id, meta: d.meta() }).collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(Error::storage)?;

        std::fs::create_dir_all(dir)?;
        let target = dir.join(CORPUS_FILE);
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(path = %target.display(), documents = documents.len(), "corpus saved");
        Ok(target)
    }

    pub fn load(dir: &Path) -> Result<CorpusTable> {
        let path = dir.join(CORPUS_FILE);
        let raw = std::fs::read(&path).map_err(|e| Error::CorpusLoad(format!("{}: {}", path.display(), e)))?;
        let file: CorpusFile = serde_json::from_slice(&raw).map_err(|e| Error::CorpusLoad(format!("{}: {}", path.display(), e)))?;
        let mut rows = Vec::with_capacity(file.documents.len());
        for (expected, row) in file.documents.into_iter().enumerate() {
            if row.id as usize != expected {
                return Err(Error::CorpusLoad(format!("{}: expected document id {}, found {}", path.display(), expected, row.id)));
            }
            rows.push(row.meta);
        }
        Ok(CorpusTable { version: file.version, image_root: file.image_root, dimension: file.dimension, rows })
    }
}
