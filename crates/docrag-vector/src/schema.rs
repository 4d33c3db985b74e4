use arrow_schema::{DataType, Field, Schema};
use std::collections::HashMap;
use std::sync::Arc;

/// Version of the on-disk layout (manifest and vector blob).
pub const FORMAT_VERSION: u32 = 1;

pub const META_FORMAT_VERSION: &str = "format_version";
pub const META_VECTOR_DIM: &str = "vector_dim";

pub fn vector_item_field() -> Arc<Field> {
	Arc::new(Field::new("item", DataType::Float32, true))
}

/// `{ id: UInt64, vector: FixedSizeList<Float32>[dim] }` with the format
/// version and dimension recorded in the schema metadata.
pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
	let metadata = HashMap::from([
		(META_FORMAT_VERSION.to_string(), FORMAT_VERSION.to_string()),
		(META_VECTOR_DIM.to_string(), dim.to_string()),
	]);
	Arc::new(
		Schema::new(vec![
			Field::new("id", DataType::UInt64, false),
			Field::new("vector", DataType::FixedSizeList(vector_item_field(), dim as i32), false),
		])
		.with_metadata(metadata),
	)
}
