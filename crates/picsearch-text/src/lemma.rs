use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use picsearch_core::traits::Lemmatizer;

use crate::tantivy_utils::build_analyzer;

/// Default lemmatizer: unicode word split, lowercasing and stop-word removal.
///
/// This does no morphological analysis; a real lemmatizer for the corpus
/// language can be injected through the `Lemmatizer` trait instead.
#[derive(Clone)]
pub struct AnalyzerLemmatizer {
	analyzer: TextAnalyzer,
}

impl AnalyzerLemmatizer {
	pub fn new(stop_words: &[String]) -> Self { Self { analyzer: build_analyzer(stop_words) } }
}

impl Default for AnalyzerLemmatizer {
	fn default() -> Self { Self::new(&[]) }
}

impl Lemmatizer for AnalyzerLemmatizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		// token_stream needs &mut; analyzers are cheap to clone
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		stream.process(&mut |token| out.push(token.text.clone()));
		out
	}
}
