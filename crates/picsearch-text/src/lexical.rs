use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use picsearch_core::error::{Error, Result};
use picsearch_core::types::CorpusVersion;

use crate::tantivy_utils::{build_schema, pre_tokenized, schema_fields, DOC_ID_FIELD};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// BM25 scorer over lemma sequences, backed by an on-disk tantivy index.
///
/// Documents are added in id order from a single indexing thread and
/// committed once; the corpus version travels in the commit payload.
pub struct LexicalIndex {
	searcher: Searcher,
	tokens_field: Field,
	num_docs: usize,
	version: CorpusVersion,
}

impl LexicalIndex {
	/// Create a brand-new index in `dir` (any existing content is removed).
	pub fn build(dir: &Path, documents: &[Vec<String>], version: &CorpusVersion) -> Result<Self> {
		if dir.exists() { std::fs::remove_dir_all(dir)?; }
		std::fs::create_dir_all(dir)?;
		let schema = build_schema();
		let index = Index::create_in_dir(dir, schema.clone()).map_err(Error::storage)?;
		let (doc_id_field, tokens_field) = schema_fields(&schema)?;

		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(Error::storage)?;
		for (id, tokens) in documents.iter().enumerate() {
			let mut doc = TantivyDocument::default();
			doc.add_u64(doc_id_field, id as u64);
			doc.add_pre_tokenized_text(tokens_field, pre_tokenized(tokens));
			writer.add_document(doc).map_err(Error::storage)?;
		}
		let mut commit = writer.prepare_commit().map_err(Error::storage)?;
		commit.set_payload(version.as_str());
		commit.commit().map_err(Error::storage)?;
		writer.wait_merging_threads().map_err(Error::storage)?;
		tracing::debug!(dir = %dir.display(), documents = documents.len(), "lexical index committed");

		Self::from_index(&index, version.clone())
	}

	/// Reopen a persisted index. Fails with `CorpusLoad` if it is missing,
	/// unreadable, or carries no corpus version.
	pub fn open(dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(dir).map_err(|e| Error::CorpusLoad(format!("{}: {}", dir.display(), e)))?;
		let metas = index.load_metas().map_err(Error::corpus_load)?;
		let version = metas.payload.ok_or_else(|| Error::CorpusLoad(format!("{}: lexical index has no corpus version", dir.display())))?;
		Self::from_index(&index, CorpusVersion::new(version))
	}

	fn from_index(index: &Index, version: CorpusVersion) -> Result<Self> {
		let (_, tokens_field) = schema_fields(&index.schema())?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(Error::corpus_load)?;
		let searcher = reader.searcher();
		let num_docs = usize::try_from(searcher.num_docs()).map_err(Error::corpus_load)?;
		Ok(Self { searcher, tokens_field, num_docs, version })
	}

	pub fn num_docs(&self) -> usize { self.num_docs }

	pub fn version(&self) -> &CorpusVersion { &self.version }

	/// BM25 score of every document for `tokens`, indexed by document id.
	/// Unknown tokens contribute nothing; an empty query scores all zeros.
	pub fn score(&self, tokens: &[String]) -> Result<Vec<f32>> {
		let mut scores = vec![0.0f32; self.num_docs];
		if self.num_docs == 0 || tokens.is_empty() { return Ok(scores); }

		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.tokens_field, t);
				(Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
			})
			.collect();
		let query = BooleanQuery::new(clauses);
		let top_docs = self.searcher.search(&query, &TopDocs::with_limit(self.num_docs)).map_err(Error::storage)?;
		let doc_ids = self
			.searcher
			.segment_readers()
			.iter()
			.map(|segment| segment.fast_fields().u64(DOC_ID_FIELD))
			.collect::<tantivy::Result<Vec<_>>>()
			.map_err(Error::storage)?;
		for (score, addr) in top_docs {
			let id = doc_ids
				.get(addr.segment_ord as usize)
				.and_then(|column| column.first(addr.doc_id))
				.ok_or_else(|| Error::Storage("lexical document without doc_id".to_string()))?;
			match scores.get_mut(id as usize) {
				Some(slot) => *slot = score,
				None => return Err(Error::Storage(format!("lexical doc_id {} outside corpus of {}", id, self.num_docs))),
			}
		}
		Ok(scores)
	}
}
