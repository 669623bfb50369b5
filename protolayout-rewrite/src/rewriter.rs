use crate::error::RewriteError;
use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use protolayout_index::SchemaIndex;
use protolayout_types::{PackageName, SchemaFile};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Original file path -> computed package name.
pub type PackageMapping = BTreeMap<Utf8PathBuf, PackageName>;

/// Rewriting context: the file index plus the settings the phases need.
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    root_package: Option<PackageName>,
    extern_imports: Vec<Pattern>,
    index: SchemaIndex,
    packages_fixed: bool,
    /// (file, import number) -> import string left by the last
    /// `fix_imports` run and the file it was resolved to.
    resolved_imports: BTreeMap<(Utf8PathBuf, usize), (String, Utf8PathBuf)>,
}

impl Rewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_package(root: &str) -> Result<Self, RewriteError> {
        let mut rewriter = Self::new();
        rewriter.set_root_package(root)?;
        Ok(rewriter)
    }

    pub fn set_root_package(&mut self, root: &str) -> Result<(), RewriteError> {
        let root: PackageName = root.parse()?;
        if self.root_package.as_ref() != Some(&root) {
            self.packages_fixed = false;
        }
        self.root_package = Some(root);
        Ok(())
    }

    pub fn root_package(&self) -> Option<&PackageName> {
        self.root_package.as_ref()
    }

    /// Glob patterns (e.g. `google/protobuf/*`) for imports that live outside
    /// the inputs and must be left as they are.
    pub fn set_extern_imports<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
    ) -> Result<(), RewriteError> {
        self.extern_imports = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| RewriteError::Configuration {
                    message: format!("invalid extern import pattern '{}': {}", p.as_ref(), e),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Index `.proto` files under `dirs`, replacing whatever was read before.
    pub fn read<P: AsRef<Utf8Path>>(&mut self, dirs: &[P]) -> Result<&mut Self, RewriteError> {
        let index = SchemaIndex::read(dirs)?;
        info!(files = index.len(), "read schema files");
        Ok(self.load(index))
    }

    /// Use an already built index.
    pub fn load(&mut self, index: SchemaIndex) -> &mut Self {
        self.index = index;
        self.packages_fixed = false;
        self.resolved_imports.clear();
        self
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn into_index(self) -> SchemaIndex {
        self.index
    }

    /// Package every indexed file ends up in under the root package.
    pub fn calculated_packages(&self) -> Result<PackageMapping, RewriteError> {
        let root = self
            .root_package
            .as_ref()
            .ok_or_else(RewriteError::missing_root_package)?;

        let mut out = PackageMapping::new();
        for file in self.index.iter() {
            if let Some(line) = file.unreadable_package() {
                return Err(RewriteError::UnreadablePackage {
                    path: file.path.clone(),
                    line: line.to_string(),
                });
            }
            let current = effective_package(file)?;
            out.insert(
                file.path.clone(),
                PackageName::nest_under(root, current.as_ref()),
            );
        }
        Ok(out)
    }

    /// Rewrite every `package` declaration to its calculated package.
    ///
    /// Files without a declaration get one. Running this again with the same
    /// root package changes nothing.
    pub fn fix_packages(&mut self) -> Result<&mut Self, RewriteError> {
        let mapping = self.calculated_packages()?;

        let mut changed = 0usize;
        for file in self.index.iter_mut() {
            let Some(new) = mapping.get(&file.path) else {
                continue;
            };
            if file.declared_package() == Some(new) {
                continue;
            }
            debug!(path = %file.path, package = %new, "fix package");
            file.set_package(new.clone());
            changed += 1;
        }

        self.packages_fixed = true;
        info!(files = self.index.len(), changed, "fixed packages");
        Ok(self)
    }

    /// Point every import at the current location of the imported file
    /// (`<package dir>/<file name>`).
    ///
    /// All imports are resolved before anything is modified, so an
    /// unresolved import leaves the index untouched.
    pub fn fix_imports(&mut self) -> Result<&mut Self, RewriteError> {
        if self.root_package.is_some() && !self.packages_fixed {
            warn!("fixing imports before packages; imports will follow the current packages");
        }

        let locations = self.locations()?;
        let roots: Vec<Utf8PathBuf> = self
            .index
            .roots()
            .into_iter()
            .map(Utf8Path::to_path_buf)
            .collect();

        let mut resolved: Vec<(Utf8PathBuf, usize, String, Utf8PathBuf)> = Vec::new();
        let mut unresolved: Vec<(Utf8PathBuf, String)> = Vec::new();

        for file in self.index.iter() {
            for (n, import) in file.imports().enumerate() {
                if self.is_extern(&import.path) {
                    debug!(path = %file.path, import = %import.path, "extern import left as is");
                    continue;
                }

                let Some(target) = self.resolve(file, n, &import.path, &roots, &locations) else {
                    warn!(path = %file.path, import = %import.path, "cannot resolve import");
                    unresolved.push((file.path.clone(), import.path.clone()));
                    continue;
                };

                let new = import_path_of(target)?;
                resolved.push((file.path.clone(), n, new, target.path.clone()));
            }
        }

        if let Some((file, import)) = unresolved.into_iter().next() {
            return Err(RewriteError::UnresolvedImport { file, import });
        }

        let mut changed = 0usize;
        for (path, n, new, target) in resolved {
            if let Some(file) = self.index.get_mut(&path)
                && file.imports().nth(n).is_some_and(|i| i.path != new)
            {
                debug!(path = %path, import = %new, "fix import");
                file.set_import_path(n, new.clone());
                changed += 1;
            }
            self.resolved_imports.insert((path, n), (new, target));
        }

        info!(files = self.index.len(), changed, "fixed imports");
        Ok(self)
    }

    /// Current text of one indexed file.
    pub fn content(&self, path: &Utf8Path) -> Result<String, RewriteError> {
        self.index
            .get(path)
            .map(SchemaFile::render)
            .ok_or_else(|| RewriteError::UnknownFile {
                path: path.to_path_buf(),
                available: self.available(),
            })
    }

    fn is_extern(&self, import: &str) -> bool {
        self.extern_imports.iter().any(|p| p.matches(import))
    }

    /// File the `n`-th import of `file` points at.
    ///
    /// An import still holding the string an earlier run left there keeps
    /// its earlier target. Otherwise tried in order: the importing file's
    /// own input root, every other input root, the current location of
    /// each file.
    fn resolve(
        &self,
        file: &SchemaFile,
        n: usize,
        import: &str,
        roots: &[Utf8PathBuf],
        locations: &BTreeMap<String, Utf8PathBuf>,
    ) -> Option<&SchemaFile> {
        if let Some((written, target)) = self.resolved_imports.get(&(file.path.clone(), n))
            && written == import
            && let Some(found) = self.index.get(target)
        {
            return Some(found);
        }

        if let Some(found) = self.index.get(&file.root.join(import)) {
            return Some(found);
        }

        for root in roots {
            if let Some(found) = self.index.get(&root.join(import)) {
                return Some(found);
            }
        }

        locations.get(import).and_then(|path| self.index.get(path))
    }

    fn locations(&self) -> Result<BTreeMap<String, Utf8PathBuf>, RewriteError> {
        let mut out = BTreeMap::new();
        for file in self.index.iter() {
            out.entry(import_path_of(file)?)
                .or_insert_with(|| file.path.clone());
        }
        Ok(out)
    }

    fn available(&self) -> String {
        let names: Vec<&str> = self.index.paths().map(|p| p.as_str()).collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }
}

fn effective_package(file: &SchemaFile) -> Result<Option<PackageName>, RewriteError> {
    file.effective_package()
        .map_err(|source| RewriteError::PackageFromPath {
            path: file.path.clone(),
            source,
        })
}

/// Import string that reaches `file` at its current location:
/// package segments and file name joined with `/`.
pub fn import_path_of(file: &SchemaFile) -> Result<String, RewriteError> {
    let mut parts: Vec<String> = match effective_package(file)? {
        Some(p) => p.segments().to_vec(),
        None => Vec::new(),
    };
    parts.push(file.file_name().to_string());
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROOT: &str = "src/proto";

    fn index(files: &[(&str, &str)]) -> SchemaIndex {
        SchemaIndex::from_sources(
            files
                .iter()
                .map(|(rel, text)| (ROOT, format!("{ROOT}/{rel}"), *text)),
        )
    }

    fn p(rel: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{ROOT}/{rel}"))
    }

    fn rewriter(root: &str, files: &[(&str, &str)]) -> Rewriter {
        let mut r = Rewriter::with_root_package(root).unwrap();
        r.load(index(files));
        r
    }

    #[test]
    fn calculated_packages_requires_root() {
        let mut r = Rewriter::new();
        r.load(index(&[("a.proto", "package a;\n")]));
        let err = r.calculated_packages().unwrap_err();
        assert!(matches!(err, RewriteError::Configuration { .. }));
    }

    #[test]
    fn fix_packages_requires_root() {
        let mut r = Rewriter::new();
        r.load(index(&[("a.proto", "package a;\n")]));
        assert!(matches!(
            r.fix_packages().unwrap_err(),
            RewriteError::Configuration { .. }
        ));
        assert_eq!(r.content(&p("a.proto")).unwrap(), "package a;\n");
    }

    #[test]
    fn invalid_root_package_is_rejected() {
        assert!(matches!(
            Rewriter::with_root_package("foo..bar").unwrap_err(),
            RewriteError::InvalidPackageName(_)
        ));
        assert!(matches!(
            Rewriter::with_root_package("").unwrap_err(),
            RewriteError::InvalidPackageName(_)
        ));
    }

    #[test]
    fn subscription_scenario() {
        let mut r = rewriter(
            "foo",
            &[(
                "services/request/subscription.proto",
                "syntax = \"proto3\";\npackage namespace.services.request;\n",
            )],
        );
        let mapping = r.calculated_packages().unwrap();
        assert_eq!(
            mapping[&p("services/request/subscription.proto")].to_string(),
            "foo.namespace.services.request"
        );

        r.fix_packages().unwrap();
        assert_eq!(
            r.content(&p("services/request/subscription.proto")).unwrap(),
            "syntax = \"proto3\";\npackage foo.namespace.services.request;\n"
        );
    }

    #[test]
    fn overlap_scenario() {
        let mut r = rewriter("foo.namespace", &[("x.proto", "package namespace.proto;\n")]);
        r.fix_packages().unwrap();
        assert_eq!(
            r.content(&p("x.proto")).unwrap(),
            "package foo.namespace.proto;\n"
        );
    }

    #[test]
    fn fix_packages_twice_is_stable() {
        let mut r = rewriter("foo", &[("x.proto", "package namespace.a;\n")]);
        r.fix_packages().unwrap();
        let once = r.content(&p("x.proto")).unwrap();
        r.fix_packages().unwrap();
        assert_eq!(r.content(&p("x.proto")).unwrap(), once);
        assert_eq!(once, "package foo.namespace.a;\n");
    }

    #[test]
    fn unreadable_package_stops_fix_packages() {
        let src = "syntax = \"proto3\";\npackage a.1b;\n";
        let mut r = rewriter("foo", &[("a/x.proto", src)]);
        match r.fix_packages().unwrap_err() {
            RewriteError::UnreadablePackage { path, line } => {
                assert_eq!(path, p("a/x.proto"));
                assert_eq!(line, "package a.1b;");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(r.content(&p("a/x.proto")).unwrap(), src);
    }

    #[test]
    fn single_quoted_imports_are_rewritten() {
        let mut r = rewriter(
            "foo",
            &[
                ("x.proto", "package x;\nimport 'y/y.proto';\n"),
                ("y/y.proto", "package y;\n"),
            ],
        );
        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(
            r.content(&p("x.proto")).unwrap(),
            "package foo.x;\nimport 'foo/y/y.proto';\n"
        );
    }

    #[test]
    fn missing_package_is_derived_from_directory() {
        let mut r = rewriter(
            "foo",
            &[("legacy/flags.proto", "syntax = \"proto3\";\nmessage Flags {}\n")],
        );
        r.fix_packages().unwrap();
        assert_eq!(
            r.content(&p("legacy/flags.proto")).unwrap(),
            "syntax = \"proto3\";\npackage foo.legacy;\nmessage Flags {}\n"
        );
    }

    #[test]
    fn imports_follow_fixed_packages() {
        let mut r = rewriter(
            "foo",
            &[
                (
                    "services/sub.proto",
                    "package namespace.services;\nimport \"common/ids.proto\";\n",
                ),
                ("common/ids.proto", "package namespace.common;\n"),
            ],
        );
        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(
            r.content(&p("services/sub.proto")).unwrap(),
            "package foo.namespace.services;\nimport \"foo/namespace/common/ids.proto\";\n"
        );
    }

    #[test]
    fn fix_imports_twice_is_stable() {
        let mut r = rewriter(
            "foo",
            &[
                ("a.proto", "package a;\nimport public \"b/b.proto\"; // keep\n"),
                ("b/b.proto", "package b;\n"),
            ],
        );
        r.fix_packages().unwrap().fix_imports().unwrap();
        let once = r.content(&p("a.proto")).unwrap();
        assert_eq!(once, "package foo.a;\nimport public \"foo/b/b.proto\"; // keep\n");

        r.fix_imports().unwrap();
        assert_eq!(r.content(&p("a.proto")).unwrap(), once);
    }

    #[test]
    fn fix_imports_twice_keeps_targets_when_paths_collide() {
        // `foo/y/y.proto` is both the rewritten import and a real input path.
        let mut r = rewriter(
            "foo",
            &[
                ("x.proto", "package x;\nimport \"y/y.proto\";\n"),
                ("y/y.proto", "package y;\n"),
                ("foo/y/y.proto", "package other;\n"),
            ],
        );
        r.fix_packages().unwrap().fix_imports().unwrap();
        let once = r.content(&p("x.proto")).unwrap();
        assert_eq!(once, "package foo.x;\nimport \"foo/y/y.proto\";\n");

        r.fix_imports().unwrap();
        assert_eq!(r.content(&p("x.proto")).unwrap(), once);

        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(r.content(&p("x.proto")).unwrap(), once);
    }

    #[test]
    fn imports_before_packages_use_old_packages() {
        let mut r = rewriter(
            "foo",
            &[
                ("a.proto", "package a;\nimport \"b/b.proto\";\n"),
                ("b/b.proto", "package other;\n"),
            ],
        );
        r.fix_imports().unwrap();
        assert_eq!(
            r.content(&p("a.proto")).unwrap(),
            "package a;\nimport \"other/b.proto\";\n"
        );

        // The relocated import still resolves once packages move.
        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(
            r.content(&p("a.proto")).unwrap(),
            "package foo.a;\nimport \"foo/other/b.proto\";\n"
        );
    }

    #[test]
    fn unresolved_import_fails_without_changes() {
        let mut r = rewriter(
            "foo",
            &[
                ("a.proto", "package a;\nimport \"b.proto\";\nimport \"missing.proto\";\n"),
                ("b.proto", "package b;\n"),
            ],
        );
        let err = r.fix_imports().unwrap_err();
        match err {
            RewriteError::UnresolvedImport { file, import } => {
                assert_eq!(file, p("a.proto"));
                assert_eq!(import, "missing.proto");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            r.content(&p("a.proto")).unwrap(),
            "package a;\nimport \"b.proto\";\nimport \"missing.proto\";\n"
        );
    }

    #[test]
    fn extern_imports_are_left_alone() {
        let mut r = rewriter(
            "foo",
            &[(
                "a.proto",
                "package a;\nimport \"google/protobuf/timestamp.proto\";\n",
            )],
        );
        r.set_extern_imports(&["google/protobuf/*"]).unwrap();
        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(
            r.content(&p("a.proto")).unwrap(),
            "package foo.a;\nimport \"google/protobuf/timestamp.proto\";\n"
        );
    }

    #[test]
    fn bad_extern_pattern_is_configuration_error() {
        let mut r = Rewriter::new();
        assert!(matches!(
            r.set_extern_imports(&["[unclosed"]).unwrap_err(),
            RewriteError::Configuration { .. }
        ));
    }

    #[test]
    fn imports_resolve_across_input_roots() {
        let mut r = Rewriter::with_root_package("foo").unwrap();
        r.load(SchemaIndex::from_sources([
            ("one", "one/a.proto", "package a;\nimport \"shared/s.proto\";\n"),
            ("two", "two/shared/s.proto", "package shared;\n"),
        ]));
        r.fix_packages().unwrap().fix_imports().unwrap();
        assert_eq!(
            r.content(Utf8Path::new("one/a.proto")).unwrap(),
            "package foo.a;\nimport \"foo/shared/s.proto\";\n"
        );
    }

    #[test]
    fn content_of_unknown_file_lists_available() {
        let r = rewriter("foo", &[("a.proto", "package a;\n")]);
        let err = r.content(Utf8Path::new("nope.proto")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope.proto"));
        assert!(msg.contains("src/proto/a.proto"));
    }

    #[test]
    fn changing_root_package_recomputes() {
        let mut r = rewriter("foo", &[("a.proto", "package a;\n")]);
        r.fix_packages().unwrap();
        r.set_root_package("bar").unwrap();
        r.fix_packages().unwrap();
        assert_eq!(r.content(&p("a.proto")).unwrap(), "package bar.foo.a;\n");
    }
}
