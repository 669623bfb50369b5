//! Default process-backed port implementations.

use crate::ports::CompilerPort;
use anyhow::Context;
use protolayout_compile::ProtocInvocation;
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

/// Spawns `protoc` as a child process and waits for it.
#[derive(Debug, Clone, Default)]
pub struct ProcessCompiler;

impl CompilerPort for ProcessCompiler {
    fn run(&self, invocation: &ProtocInvocation) -> anyhow::Result<Option<i32>> {
        debug!(command = %invocation, "spawning protoc");
        let status = Command::new(invocation.program.as_std_path())
            .args(&invocation.args)
            .status()
            .with_context(|| format!("run {}", invocation.program))?;
        Ok(status.code())
    }
}

/// Records invocations instead of running them, for embedding and testing.
///
/// Every run reports `exit_code`.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    exit_code: i32,
    runs: Mutex<Vec<ProtocInvocation>>,
}

impl RecordingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            runs: Mutex::default(),
        }
    }

    pub fn runs(&self) -> Vec<ProtocInvocation> {
        self.runs
            .lock()
            .map(|runs| runs.clone())
            .unwrap_or_default()
    }
}

impl CompilerPort for RecordingCompiler {
    fn run(&self, invocation: &ProtocInvocation) -> anyhow::Result<Option<i32>> {
        self.runs
            .lock()
            .map_err(|_| anyhow::anyhow!("recording compiler lock poisoned"))?
            .push(invocation.clone());
        Ok(Some(self.exit_code))
    }
}
