use crate::package::{PackageName, PackageNameError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportModifier {
    Public,
    Weak,
}

/// A parsed `import` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ImportModifier>,
}

/// `package` line split around the package name.
///
/// `head` holds everything before the name (indent, keyword, spacing) and
/// `tail` everything after it (semicolon, trailing comment, line ending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLine {
    pub head: String,
    pub name: PackageName,
    pub tail: String,
}

/// `import` line split around the quoted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub head: String,
    pub decl: ImportDecl,
    pub tail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Package(PackageLine),
    Import(ImportLine),
    /// Any other line, kept verbatim including its line ending.
    Text(String),
}

impl SourceLine {
    fn render_into(&self, out: &mut String) {
        match self {
            SourceLine::Package(p) => {
                out.push_str(&p.head);
                out.push_str(&p.name.to_string());
                out.push_str(&p.tail);
            }
            SourceLine::Import(i) => {
                out.push_str(&i.head);
                out.push_str(&i.decl.path);
                out.push_str(&i.tail);
            }
            SourceLine::Text(t) => out.push_str(t),
        }
    }
}

/// One `.proto` file held in memory.
///
/// Identity is the original `path`. `root` is the input directory the file
/// was found under; the file's directory relative to it stands in for a
/// package when the source declares none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    pub path: Utf8PathBuf,
    pub root: Utf8PathBuf,
    pub lines: Vec<SourceLine>,
}

impl SchemaFile {
    pub fn new(root: Utf8PathBuf, path: Utf8PathBuf, lines: Vec<SourceLine>) -> Self {
        Self { path, root, lines }
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }

    /// Directory of the file relative to its input root.
    pub fn relative_dir(&self) -> &Utf8Path {
        let rel = self.path.strip_prefix(&self.root).unwrap_or(&self.path);
        rel.parent().unwrap_or(Utf8Path::new(""))
    }

    /// First `package` declaration in the source, if any.
    pub fn declared_package(&self) -> Option<&PackageName> {
        self.lines.iter().find_map(|l| match l {
            SourceLine::Package(p) => Some(&p.name),
            _ => None,
        })
    }

    /// A `package` statement the scanner could not read (e.g. `package a.1b;`),
    /// when the file has no readable one.
    pub fn unreadable_package(&self) -> Option<&str> {
        if self.declared_package().is_some() {
            return None;
        }
        self.lines.iter().find_map(|l| match l {
            SourceLine::Text(t) => t
                .trim_start()
                .strip_prefix("package")
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
                .then(|| t.trim()),
            _ => None,
        })
    }

    /// Declared package, falling back to the package implied by the
    /// file's directory.
    pub fn effective_package(&self) -> Result<Option<PackageName>, PackageNameError> {
        match self.declared_package() {
            Some(p) => Ok(Some(p.clone())),
            None => PackageName::from_relative_dir(self.relative_dir()),
        }
    }

    /// Path of this file relative to an output root: package dir + file name.
    pub fn location(&self) -> Result<Utf8PathBuf, PackageNameError> {
        Ok(match self.effective_package()? {
            Some(p) => p.to_dir().join(self.file_name()),
            None => Utf8PathBuf::from(self.file_name()),
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.lines.iter().filter_map(|l| match l {
            SourceLine::Import(i) => Some(&i.decl),
            _ => None,
        })
    }

    /// Replace the declared package, or insert a `package` line after the
    /// `syntax`/`edition` statement (top of file when there is none).
    ///
    /// Callers check [`SchemaFile::unreadable_package`] first; inserting
    /// next to an unreadable statement leaves two declarations.
    pub fn set_package(&mut self, name: PackageName) {
        for line in self.lines.iter_mut() {
            if let SourceLine::Package(p) = line {
                p.name = name;
                return;
            }
        }

        let at = self
            .lines
            .iter()
            .position(|l| match l {
                SourceLine::Text(t) => {
                    let t = t.trim_start();
                    t.starts_with("syntax") || t.starts_with("edition")
                }
                _ => false,
            })
            .map(|i| i + 1)
            .unwrap_or(0);

        let newline = self.newline_style();
        if at > 0
            && let Some(SourceLine::Text(prev)) = self.lines.get_mut(at - 1)
            && !prev.ends_with('\n')
        {
            prev.push_str(newline);
        }

        self.lines.insert(
            at,
            SourceLine::Package(PackageLine {
                head: "package ".to_string(),
                name,
                tail: format!(";{newline}"),
            }),
        );
    }

    /// Rewrite the path of the `n`-th import statement (0-based, source
    /// order). Returns false when there is no such import.
    pub fn set_import_path(&mut self, n: usize, path: String) -> bool {
        let target = self
            .lines
            .iter_mut()
            .filter_map(|l| match l {
                SourceLine::Import(i) => Some(i),
                _ => None,
            })
            .nth(n);
        match target {
            Some(i) => {
                i.decl.path = path;
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            line.render_into(&mut out);
        }
        out
    }

    fn newline_style(&self) -> &'static str {
        let crlf = self.lines.iter().any(|l| match l {
            SourceLine::Text(t) => t.ends_with("\r\n"),
            SourceLine::Package(p) => p.tail.ends_with("\r\n"),
            SourceLine::Import(i) => i.tail.ends_with("\r\n"),
        });
        if crlf { "\r\n" } else { "\n" }
    }
}
