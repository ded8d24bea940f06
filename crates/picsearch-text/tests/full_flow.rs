use tempfile::TempDir;

use picsearch_core::traits::Lemmatizer;
use picsearch_core::types::CorpusVersion;
use picsearch_text::{AnalyzerLemmatizer, LexicalIndex};

fn captions() -> Vec<&'static str> {
	vec!["a horse in a field", "a red car", "a brown dog barking"]
}

#[test]
fn persisted_index_reproduces_scores() {
	let tmp = TempDir::new().unwrap();
	let lemmatizer = AnalyzerLemmatizer::default();
	let docs: Vec<Vec<String>> = captions().into_iter().map(|c| lemmatizer.tokenize(c)).collect();
	let version = CorpusVersion::new("20260101T000000Z-abcdef012345");

	let built = LexicalIndex::build(tmp.path(), &docs, &version).unwrap();
	let query = lemmatizer.tokenize("dog barking in a field");
	let before = built.score(&query).unwrap();
	drop(built);

	let reopened = LexicalIndex::open(tmp.path()).unwrap();
	assert_eq!(reopened.version(), &version);
	assert_eq!(reopened.num_docs(), 3);
	let after = reopened.score(&query).unwrap();
	assert_eq!(before, after);
	assert!(after[2] > after[1]);
}

#[test]
fn scores_are_deterministic_across_builds() {
	let a = TempDir::new().unwrap();
	let b = TempDir::new().unwrap();
	let lemmatizer = AnalyzerLemmatizer::default();
	let docs: Vec<Vec<String>> = captions().into_iter().map(|c| lemmatizer.tokenize(c)).collect();
	let v = CorpusVersion::new("v1");
	let query = lemmatizer.tokenize("red horse");
	let sa = LexicalIndex::build(a.path(), &docs, &v).unwrap().score(&query).unwrap();
	let sb = LexicalIndex::build(b.path(), &docs, &v).unwrap().score(&query).unwrap();
	assert_eq!(sa, sb);
}

#[test]
fn repeated_query_token_counts_per_occurrence() {
	let tmp = TempDir::new().unwrap();
	let docs = vec![vec!["dog".to_string()], vec!["cat".to_string()]];
	let idx = LexicalIndex::build(tmp.path(), &docs, &CorpusVersion::new("v")).unwrap();
	let once = idx.score(&["dog".to_string()]).unwrap()[0];
	let twice = idx.score(&["dog".to_string(), "dog".to_string()]).unwrap()[0];
	assert!(twice > once);
}

#[test]
fn opening_a_missing_index_is_a_load_error() {
	let tmp = TempDir::new().unwrap();
	let err = LexicalIndex::open(&tmp.path().join("nope")).err().unwrap();
	assert_eq!(err.kind(), "corpus_load");
}

#[test]
fn rebuilding_in_place_replaces_documents() {
	let tmp = TempDir::new().unwrap();
	let first = vec![vec!["horse".to_string()]];
	LexicalIndex::build(tmp.path(), &first, &CorpusVersion::new("v1")).unwrap();
	let second = vec![vec!["car".to_string()], vec!["dog".to_string()]];
	let idx = LexicalIndex::build(tmp.path(), &second, &CorpusVersion::new("v2")).unwrap();
	assert_eq!(idx.num_docs(), 2);
	assert!(idx.score(&["horse".to_string()]).unwrap().iter().all(|s| *s == 0.0));
	assert_eq!(LexicalIndex::open(tmp.path()).unwrap().version().as_str(), "v2");
}
