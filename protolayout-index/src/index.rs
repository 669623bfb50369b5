use crate::parse::parse_schema;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::{Pattern, glob};
use protolayout_types::{SCHEMA_EXTENSION, SchemaFile};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The directory is missing, not a directory, or holds no `.proto` file.
    #[error("no .proto files found under {dir} (missing, not a directory, or empty)")]
    NotFound { dir: Utf8PathBuf },

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

/// In-memory index of schema files keyed by original path.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    files: BTreeMap<Utf8PathBuf, SchemaFile>,
}

impl SchemaIndex {
    /// Walk `dirs` recursively and index every `.proto` file found.
    ///
    /// A file reachable from several input directories is indexed once,
    /// under the first directory that reaches it.
    pub fn read<P: AsRef<Utf8Path>>(dirs: &[P]) -> Result<Self, IndexError> {
        let mut index = Self::default();

        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                return Err(IndexError::NotFound {
                    dir: dir.to_path_buf(),
                });
            }

            let found = find_schema_files(dir)?;
            if found.is_empty() {
                return Err(IndexError::NotFound {
                    dir: dir.to_path_buf(),
                });
            }

            debug!(dir = %dir, files = found.len(), "indexing schema files");
            for path in found {
                if index.files.contains_key(&path) {
                    debug!(path = %path, "already indexed from an earlier input");
                    continue;
                }
                let text = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
                index.insert(dir.to_path_buf(), path, &text);
            }
        }

        Ok(index)
    }

    /// Build an index from in-memory `(root, path, text)` sources.
    pub fn from_sources<I, R, P, T>(sources: I) -> Self
    where
        I: IntoIterator<Item = (R, P, T)>,
        R: Into<Utf8PathBuf>,
        P: Into<Utf8PathBuf>,
        T: AsRef<str>,
    {
        let mut index = Self::default();
        for (root, path, text) in sources {
            index.insert(root.into(), path.into(), text.as_ref());
        }
        index
    }

    fn insert(&mut self, root: Utf8PathBuf, path: Utf8PathBuf, text: &str) {
        let file = SchemaFile::new(root, path.clone(), parse_schema(text));
        self.files.insert(path, file);
    }

    pub fn get(&self, path: &Utf8Path) -> Option<&SchemaFile> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &Utf8Path) -> Option<&mut SchemaFile> {
        self.files.get_mut(path)
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaFile> {
        self.files.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SchemaFile> {
        self.files.values_mut()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.files.keys()
    }

    /// Distinct input roots, in first-seen path order.
    pub fn roots(&self) -> Vec<&Utf8Path> {
        let mut roots: Vec<&Utf8Path> = Vec::new();
        for f in self.files.values() {
            if !roots.contains(&f.root.as_path()) {
                roots.push(&f.root);
            }
        }
        roots
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// All `.proto` files below `dir`, sorted.
pub fn find_schema_files(dir: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = format!("{}/**/*.{}", Pattern::escape(dir.as_str()), SCHEMA_EXTENSION);
    debug!(pattern = %pattern, "scanning for schema files");

    let mut out = Vec::new();
    for entry in glob(&pattern).with_context(|| format!("glob {}", pattern))? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;
        if path.is_file() {
            out.push(path);
        }
    }

    // Deterministic order matters.
    out.sort();
    out.dedup();
    Ok(out)
}
