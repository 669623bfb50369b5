//! Schema source ingestion.
//!
//! Walks input directories for `.proto` files and scans each one line by line
//! for its `package` and `import` statements. This is a textual scan, not a
//! protobuf grammar: anything that is not one of those two statements is kept
//! verbatim so the file can be written back byte-for-byte.

mod index;
mod parse;

pub use index::{IndexError, SchemaIndex, find_schema_files};
pub use parse::parse_schema;
