//! Domain types shared by the lexical, vector and hybrid engines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, zero-based document identifier. It is the join key between the
/// corpus table, the lexical index's document order and the vector rows.
pub type DocId = u32;

/// One indexed image, as produced by a build before it is split into the
/// three persisted artifacts.
///
/// - `path`: image path relative to the build's image root
/// - `caption`: caption in the corpus language (after translation)
/// - `tokens`: lemma sequence derived from `caption`, possibly empty
/// - `embedding`: dense vector of `caption`, same dimension for every document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub path: String,
    pub caption: String,
    pub tokens: Vec<String>,
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta { path: self.path.clone(), caption: self.caption.clone(), tokens: self.tokens.clone() }
    }
}

/// The persisted corpus row for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub path: String,
    pub caption: String,
    pub tokens: Vec<String>,
}

/// Identifier shared by all three artifacts of one build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusVersion(String);

impl CorpusVersion {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CorpusVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Summary returned by a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub corpus_version: CorpusVersion,
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub duration_ms: u64,
}

/// A ranked search result. `confidence` is in `[0, 100]` and the confidences
/// of one query's results sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    pub confidence: f32,
}
