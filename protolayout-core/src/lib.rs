//! Embeddable core library for protolayout.
//!
//! Provides clap-free entry points suitable for linking into another build
//! tool or host process.
//!
//! # Port traits
//!
//! Running `protoc` is abstracted behind [`CompilerPort`](ports::CompilerPort).
//! The [`adapters`] module provides a process-backed implementation and a
//! recording one.
//!
//! # Entry points
//!
//! - [`run_steps`](pipeline::run_steps): chained rewrite steps
//! - [`run_rewrite`](pipeline::run_rewrite): read, fix, write
//! - [`run_compile`](pipeline::run_compile): drive `protoc`
//! - [`run_build`](pipeline::run_build): rewrite then compile

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-export so callers don't need the leaf crates directly.
pub use protolayout_rewrite::PackageMapping;
pub use protolayout_types::{PackageName, WriteEntry, WriteOutcome, WriteStatus};
