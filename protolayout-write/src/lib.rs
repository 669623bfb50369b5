//! Writer for rewritten schema files.
//!
//! Responsibilities:
//! - Place each indexed file at `<output root>/<package dir>/<file name>`.
//! - Skip destinations that already hold identical bytes.
//! - Produce a unified diff preview, whether or not anything is written.

mod error;

pub use error::WriteError;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use fs_err as fs;
use protolayout_index::SchemaIndex;
use protolayout_types::{SchemaFile, WriteEntry, WriteOutcome, WriteStatus};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub output_root: Utf8PathBuf,
    pub dry_run: bool,
    /// Rewrite destinations even when their bytes already match.
    pub force: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            output_root: Utf8PathBuf::from("."),
            dry_run: true,
            force: false,
        }
    }
}

/// Where `file` lands under `output_root`, given its current package.
pub fn destination_of(
    file: &SchemaFile,
    output_root: &Utf8Path,
) -> Result<Utf8PathBuf, WriteError> {
    let location = file.location().map_err(|source| WriteError::Location {
        path: file.path.clone(),
        source,
    })?;
    Ok(output_root.join(location))
}

/// Write every file of `index` into the output tree.
///
/// Destinations are all computed and checked for conflicts before anything
/// touches the disk. In dry-run mode nothing is written; the outcome still
/// lists every entry and carries the patch.
pub fn write_index(index: &SchemaIndex, opts: &WriteOptions) -> Result<WriteOutcome, WriteError> {
    let plan = plan_destinations(index, &opts.output_root)?;

    let mut outcome = WriteOutcome::new(opts.output_root.clone(), opts.dry_run);
    let mut before: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();
    let mut after: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();

    for (destination, file) in plan {
        let contents = file.render();
        let existing = read_existing(&destination)?;

        let status = if opts.dry_run {
            debug!(source = %file.path, destination = %destination, "dry-run: would write");
            WriteStatus::DryRun
        } else if !opts.force && existing.as_deref() == Some(contents.as_bytes()) {
            debug!(destination = %destination, "unchanged");
            WriteStatus::Unchanged
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
            }
            fs::write(&destination, &contents)
                .with_context(|| format!("write {}", destination))?;
            info!(source = %file.path, destination = %destination, "wrote schema file");
            WriteStatus::Written
        };

        let key = display_path(&destination, &opts.output_root);
        before.insert(
            key.clone(),
            existing
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default(),
        );
        after.insert(key, contents.clone());

        outcome.push(WriteEntry {
            source: file.path.clone(),
            destination,
            package: file.effective_package().ok().flatten(),
            status,
            bytes: contents.len() as u64,
            sha256: sha256_hex(contents.as_bytes()),
        });
    }

    outcome.patch = render_patch(&before, &after);
    info!(
        files = outcome.summary.files,
        written = outcome.summary.written,
        unchanged = outcome.summary.unchanged,
        dry_run = opts.dry_run,
        "write finished"
    );
    Ok(outcome)
}

fn plan_destinations<'a>(
    index: &'a SchemaIndex,
    output_root: &Utf8Path,
) -> Result<BTreeMap<Utf8PathBuf, &'a SchemaFile>, WriteError> {
    let mut plan: BTreeMap<Utf8PathBuf, &SchemaFile> = BTreeMap::new();
    for file in index.iter() {
        let destination = destination_of(file, output_root)?;
        if let Some(first) = plan.get(&destination) {
            return Err(WriteError::DestinationConflict {
                destination,
                first: first.path.clone(),
                second: file.path.clone(),
            });
        }
        plan.insert(destination, file);
    }
    Ok(plan)
}

fn read_existing(path: &Utf8Path) -> Result<Option<Vec<u8>>, WriteError> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path))?;
    Ok(Some(bytes))
}

fn display_path(destination: &Utf8Path, output_root: &Utf8Path) -> Utf8PathBuf {
    destination
        .strip_prefix(output_root)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| destination.to_path_buf())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Unified diff of every destination whose contents change.
pub fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, new) in after {
        let old = before.get(path).map(String::as_str).unwrap_or_default();
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        if old.is_empty() {
            out.push_str(&format!("--- /dev/null\n+++ b/{0}\n", path));
        } else {
            out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));
        }

        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy repeats its own ---/+++ header; keep only the hunks.
        for line in body.lines().skip_while(|l| !l.starts_with("@@")) {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}
