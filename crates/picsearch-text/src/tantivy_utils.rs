use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED};
use tantivy::tokenizer::{LowerCaser, PreTokenizedString, SimpleTokenizer, StopWordFilter, TextAnalyzer, Token};

use picsearch_core::error::{Error, Result};

pub const DOC_ID_FIELD: &str = "doc_id";
pub const TOKENS_FIELD: &str = "tokens";

/// `doc_id` carries the corpus id; `tokens` holds the lemma sequence, indexed
/// verbatim (pre-tokenized) with term frequencies and field norms for BM25.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _doc_id_field = schema_builder.add_u64_field(DOC_ID_FIELD, INDEXED | FAST);
	let tokens_indexing = TextFieldIndexing::default().set_tokenizer("raw").set_index_option(IndexRecordOption::WithFreqs).set_fieldnorms(true);
	let _tokens_field = schema_builder.add_text_field(TOKENS_FIELD, TextOptions::default().set_indexing_options(tokens_indexing));
	schema_builder.build()
}

pub fn schema_fields(schema: &Schema) -> Result<(Field, Field)> {
	let doc_id = schema.get_field(DOC_ID_FIELD).map_err(Error::corpus_load)?;
	let tokens = schema.get_field(TOKENS_FIELD).map_err(Error::corpus_load)?;
	Ok((doc_id, tokens))
}

pub fn pre_tokenized(tokens: &[String]) -> PreTokenizedString {
	let mut offset = 0usize;
	let tokens = tokens.iter().enumerate().map(|(position, text)| {
		let token = Token { offset_from: offset, offset_to: offset + text.len(), position, text: text.clone(), position_length: 1 };
		offset += text.len() + 1;
		token
	}).collect::<Vec<_>>();
	PreTokenizedString { text: tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "), tokens }
}

/// Unicode word splitting + lowercasing, with an optional stop-word list.
pub fn build_analyzer(stop_words: &[String]) -> TextAnalyzer {
	let builder = TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser);
	if stop_words.is_empty() {
		builder.build()
	} else {
		builder.filter(StopWordFilter::remove(stop_words.iter().map(|s| s.to_lowercase()))).build()
	}
}
