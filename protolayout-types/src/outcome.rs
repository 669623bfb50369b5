use crate::package::PackageName;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// Dry-run: nothing touched.
    DryRun,
    Written,
    /// Destination already holds identical bytes.
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteEntry {
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageName>,

    pub status: WriteStatus,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteSummary {
    pub files: u64,
    pub written: u64,
    pub unchanged: u64,
    pub dry_run: u64,
}

/// Result of writing (or previewing) a rewritten index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub output_root: Utf8PathBuf,
    pub dry_run: bool,

    #[serde(default)]
    pub entries: Vec<WriteEntry>,
    pub summary: WriteSummary,

    /// Unified diff of destination contents before/after.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patch: String,
}

impl WriteOutcome {
    pub fn new(output_root: Utf8PathBuf, dry_run: bool) -> Self {
        Self {
            output_root,
            dry_run,
            entries: vec![],
            summary: WriteSummary::default(),
            patch: String::new(),
        }
    }

    pub fn push(&mut self, entry: WriteEntry) {
        self.summary.files += 1;
        match entry.status {
            WriteStatus::DryRun => self.summary.dry_run += 1,
            WriteStatus::Written => self.summary.written += 1,
            WriteStatus::Unchanged => self.summary.unchanged += 1,
        }
        self.entries.push(entry);
    }
}
