//! `protoc` driving for protolayout.
//!
//! This crate only decides what to run: which plugins, which parameters,
//! which files. Spawning the process is left to the caller.

mod compiler;
mod error;
pub mod options;

pub use compiler::{
    CompileRequest, PROTOC_ENV, ProtocInvocation, discover_files, find_protoc, find_protoc_in,
    plan_invocations,
};
pub use error::CompileError;
pub use options::{COMPILE_OPTIONS, CompileOption, OPTION_GROUPS, OptionGroup, resolve_options};
