//! Model artifact persistence

mod serializer;

pub use serializer::{load_pipeline, pipeline_from_bytes, pipeline_to_bytes, save_pipeline};
