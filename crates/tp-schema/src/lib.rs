//! # tp-schema
//!
//! The schema-to-relational projector: identifier flattening, name
//! inflection, type resolution, primary-key derivation, and Draft-4 record
//! validation. Pure and synchronous, no SQL, no I/O.

mod inflect;
mod projector;
mod types;
mod validator;

pub use inflect::{consonant_strip_abbrev, flatten_path, inflect_identifier};
pub use projector::{flatten_record, flatten_schema, primary_column_names, table_name, FlattenedRecord, ProjectedSchema};
pub use types::{column_type, most_general_type};
pub use validator::Validator;
