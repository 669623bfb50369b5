use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A dot-separated protobuf package name, e.g. `foo.namespace.services`.
///
/// Always holds at least one segment; every segment is an identifier
/// (`[A-Za-z_][A-Za-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageNameError {
    #[error("package name is empty")]
    Empty,

    #[error("invalid package name '{value}': '{segment}' is not an identifier")]
    InvalidSegment { value: String, segment: String },
}

impl PackageName {
    /// Build a package from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PackageNameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PackageNameError::Empty);
        }
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(PackageNameError::InvalidSegment {
                value: segments.join("."),
                segment: bad.clone(),
            });
        }
        Ok(Self { segments })
    }

    /// Derive a package from a directory path relative to a source root.
    ///
    /// `services/request` becomes `services.request`. A path with no normal
    /// components (the source root itself) has no package.
    pub fn from_relative_dir(dir: &Utf8Path) -> Result<Option<Self>, PackageNameError> {
        let segments: Vec<&str> = dir
            .components()
            .filter_map(|c| match c {
                camino::Utf8Component::Normal(s) => Some(s),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            return Ok(None);
        }
        Self::from_segments(segments).map(Some)
    }

    /// Nest `existing` under `root`, collapsing the overlap between the tail
    /// of `root` and the head of `existing`.
    ///
    /// `foo.namespace` + `namespace.proto` gives `foo.namespace.proto`.
    /// Re-applying the same root to the result leaves it unchanged.
    pub fn merge_root(root: &PackageName, existing: &PackageName) -> PackageName {
        let overlap = overlap_len(&root.segments, &existing.segments);
        let mut segments = root.segments[..root.segments.len() - overlap].to_vec();
        segments.extend(existing.segments.iter().cloned());
        PackageName { segments }
    }

    /// Like [`merge_root`](Self::merge_root), but a missing package becomes
    /// the root itself.
    pub fn nest_under(root: &PackageName, existing: Option<&PackageName>) -> PackageName {
        match existing {
            Some(existing) => Self::merge_root(root, existing),
            None => root.clone(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn starts_with(&self, other: &PackageName) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// Directory implied by this package: `a.b.c` -> `a/b/c`.
    pub fn to_dir(&self) -> Utf8PathBuf {
        self.segments.iter().collect()
    }
}

/// Length of the longest suffix of `root` that is also a prefix of `existing`.
fn overlap_len(root: &[String], existing: &[String]) -> usize {
    (1..=root.len().min(existing.len()))
        .rev()
        .find(|&n| root[root.len() - n..] == existing[..n])
        .unwrap_or(0)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for PackageName {
    type Err = PackageNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PackageNameError::Empty);
        }
        Self::from_segments(s.split('.'))
    }
}

impl TryFrom<String> for PackageName {
    type Error = PackageNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
