//! picsearch-text
//!
//! BM25 lexical scoring over lemma sequences (tantivy) and the default
//! analyzer-based lemmatizer.

pub mod lemma;
pub mod lexical;
pub mod tantivy_utils;

pub use lemma::AnalyzerLemmatizer;
pub use lexical::LexicalIndex;
