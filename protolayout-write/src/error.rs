//! Error types for protolayout-write.
//!
//! - Layout errors (exit code 2): two sources land on one destination, or a
//!   file has no usable package location
//! - Runtime errors (exit code 1): directory creation and file I/O

use camino::Utf8PathBuf;
use protolayout_types::PackageNameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("destination conflict: {first} and {second} both map to {destination}")]
    DestinationConflict {
        destination: Utf8PathBuf,
        first: Utf8PathBuf,
        second: Utf8PathBuf,
    },

    #[error("cannot place {path}: {source}")]
    Location {
        path: Utf8PathBuf,
        #[source]
        source: PackageNameError,
    },

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl WriteError {
    pub fn is_runtime(&self) -> bool {
        matches!(self, WriteError::Runtime(_))
    }
}
