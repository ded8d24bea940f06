use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const VECTORS_TABLE: &str = "vectors";
pub const META_TABLE: &str = "meta";

pub const META_CORPUS_VERSION: &str = "corpus_version";
pub const META_DIMENSION: &str = "dimension";

pub fn build_vectors_schema(dimension: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::UInt32, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension), true),
	]))
}

// Simple key/value table holding the corpus version and dimension of a vector artifact
pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
