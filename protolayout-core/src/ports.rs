//! Port traits abstracting process execution away from the pipeline.

use protolayout_compile::ProtocInvocation;

/// Runs `protoc`.
pub trait CompilerPort {
    /// Run one invocation to completion. Returns the exit code, or `None`
    /// when the process was terminated by a signal.
    fn run(&self, invocation: &ProtocInvocation) -> anyhow::Result<Option<i32>>;
}
