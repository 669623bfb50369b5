//! Rewriting logic: nest every indexed `.proto` file under a root package and
//! keep cross-file imports pointing at where the files will end up.
//!
//! The [`Rewriter`] is an explicit context object owned by the caller. Its
//! phases (`read`, `fix_packages`, `fix_imports`) can be chained or run one
//! at a time; each only sees the current in-memory state.

mod error;
mod rewriter;

pub use error::RewriteError;
pub use rewriter::{PackageMapping, Rewriter, import_path_of};
