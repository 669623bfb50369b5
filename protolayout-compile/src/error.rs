//! Error types for protolayout-compile.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown compile option '{option}' (accepted: {accepted})")]
    UnknownOption { option: String, accepted: String },

    #[error(
        "protoc not found: pass --protoc, set the PROTOC environment variable, or put protoc on PATH"
    )]
    CompilerNotFound,

    #[error("include directory {dir} does not exist")]
    MissingInclude { dir: Utf8PathBuf },

    #[error("protoc exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    CompilerFailed { code: Option<i32> },

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl CompileError {
    /// True for failures of the tool or of `protoc` itself, as opposed to bad inputs.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            CompileError::CompilerFailed { .. } | CompileError::Runtime(_)
        )
    }
}
