pub mod record;

pub use record::{extract_fields, model_marker, FieldMap, FieldSpec, Schema, DEFAULT_KEYS};
