//! Error types for protolayout-rewrite.
//!
//! Every variant is an input problem: the run stops and the caller fixes the
//! inputs (root package, directories, imports) before running again.

use camino::Utf8PathBuf;
use protolayout_index::IndexError;
use protolayout_types::PackageNameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    /// Root package unset where required, or another bad setting.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid package name: {0}")]
    InvalidPackageName(#[from] PackageNameError),

    /// A file's directory cannot be turned into a package name.
    #[error("cannot derive a package for {path}: {source}")]
    PackageFromPath {
        path: Utf8PathBuf,
        #[source]
        source: PackageNameError,
    },

    /// The file has a `package` statement that is not a valid package name.
    #[error("cannot read the package statement in {path}: `{line}`")]
    UnreadablePackage { path: Utf8PathBuf, line: String },

    #[error(
        "unresolved import \"{import}\" in {file}; add the imported file to the inputs or mark it as extern"
    )]
    UnresolvedImport { file: Utf8PathBuf, import: String },

    #[error("file {path} is not indexed (available: {available})")]
    UnknownFile { path: Utf8PathBuf, available: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl RewriteError {
    pub(crate) fn missing_root_package() -> Self {
        RewriteError::Configuration {
            message: "root package is not set".to_string(),
        }
    }

    /// True when the error comes from tool I/O rather than from the inputs.
    pub fn is_runtime(&self) -> bool {
        matches!(self, RewriteError::Index(IndexError::Runtime(_)))
    }
}
