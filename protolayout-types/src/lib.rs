//! Shared model types for the protolayout workspace.
//!
//! # Design constraints
//! - No I/O here; indexing and writing live in their own crates.
//! - `SchemaFile` must render back to the exact bytes it was parsed from
//!   until something mutates it.

pub mod outcome;
pub mod package;
pub mod schema;

pub use outcome::{WriteEntry, WriteOutcome, WriteStatus, WriteSummary};
pub use package::{PackageName, PackageNameError};
pub use schema::{ImportDecl, ImportLine, ImportModifier, PackageLine, SchemaFile, SourceLine};

/// File extension of schema sources.
pub const SCHEMA_EXTENSION: &str = "proto";
