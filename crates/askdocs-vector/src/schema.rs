use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	let item = |t: DataType| Arc::new(Field::new("item", t, true));
	Arc::new(Schema::new(vec![
		Field::new("seq", DataType::Int64, false),
		Field::new("point_id", DataType::Utf8, false),
		Field::new("content", DataType::Utf8, false),
		Field::new("payload", DataType::Utf8, false),
		Field::new("source", DataType::Utf8, false),
		Field::new("chunk_index", DataType::Int64, false),
		Field::new("category", DataType::Utf8, true),
		Field::new("vector", DataType::FixedSizeList(item(DataType::Float32), dim), true),
		Field::new("sparse_indices", DataType::List(item(DataType::UInt32)), false),
		Field::new("sparse_values", DataType::List(item(DataType::Float32)), false),
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("ingested_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
