//! Property-based tests for the rewrite phases.
//!
//! These tests verify that:
//! - After fix_packages + fix_imports, every import names the location of an indexed file
//! - Every declared package matches the calculated mapping
//! - Re-running both phases leaves the contents unchanged

use camino::Utf8PathBuf;
use proptest::prelude::*;
use protolayout_index::SchemaIndex;
use protolayout_rewrite::{Rewriter, import_path_of};
use std::collections::BTreeSet;

const ROOT: &str = "src/proto";

fn arb_package() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(vec!["foo", "ns", "svc", "v1"]), 0..4)
}

#[derive(Debug, Clone)]
struct Graph {
    root: Vec<&'static str>,
    packages: Vec<Vec<&'static str>>,
    edges: Vec<(usize, usize)>,
}

fn arb_graph() -> impl Strategy<Value = Graph> {
    (
        prop::collection::vec(prop::sample::select(vec!["foo", "ns", "svc"]), 1..3),
        prop::collection::vec(arb_package(), 1..5),
    )
        .prop_flat_map(|(root, packages)| {
            let n = packages.len();
            let edges = prop::collection::vec((0..n, 0..n), 0..6);
            (Just(root), Just(packages), edges)
        })
        .prop_map(|(root, packages, edges)| Graph {
            root,
            packages,
            edges: edges.into_iter().filter(|(a, b)| a != b).collect(),
        })
}

fn rel_path(i: usize) -> String {
    format!("d{i}/f{i}.proto")
}

fn build_index(g: &Graph) -> SchemaIndex {
    let sources = g.packages.iter().enumerate().map(|(i, pkg)| {
        let mut text = String::from("syntax = \"proto3\";\n");
        if !pkg.is_empty() {
            text.push_str(&format!("package {};\n", pkg.join(".")));
        }
        let targets: BTreeSet<usize> = g
            .edges
            .iter()
            .filter(|(from, _)| *from == i)
            .map(|(_, to)| *to)
            .collect();
        for t in targets {
            text.push_str(&format!("import \"{}\";\n", rel_path(t)));
        }
        text.push_str(&format!("message M{i} {{}}\n"));
        (ROOT.to_string(), format!("{ROOT}/{}", rel_path(i)), text)
    });
    SchemaIndex::from_sources(sources)
}

proptest! {
    #[test]
    fn imports_and_packages_agree(g in arb_graph()) {
        let mut r = Rewriter::with_root_package(&g.root.join(".")).unwrap();
        r.load(build_index(&g));
        r.fix_packages().unwrap().fix_imports().unwrap();

        let mapping = r.calculated_packages().unwrap();
        let locations: BTreeSet<String> = r
            .index()
            .iter()
            .map(|f| import_path_of(f).unwrap())
            .collect();

        for file in r.index().iter() {
            prop_assert_eq!(file.declared_package(), mapping.get(&file.path));
            for import in file.imports() {
                prop_assert!(
                    locations.contains(&import.path),
                    "import {} of {} does not name an indexed file",
                    import.path,
                    file.path
                );
            }
        }
    }

    #[test]
    fn rerunning_phases_changes_nothing(g in arb_graph()) {
        let mut r = Rewriter::with_root_package(&g.root.join(".")).unwrap();
        r.load(build_index(&g));
        r.fix_packages().unwrap().fix_imports().unwrap();

        let snapshot: Vec<String> = r.index().iter().map(|f| f.render()).collect();
        r.fix_packages().unwrap().fix_imports().unwrap();
        let again: Vec<String> = r.index().iter().map(|f| f.render()).collect();
        prop_assert_eq!(snapshot, again);
    }
}

#[test]
fn read_then_calculated_packages_without_root_fails() {
    let mut r = Rewriter::new();
    r.load(SchemaIndex::from_sources([(
        ROOT,
        Utf8PathBuf::from(ROOT).join("a.proto"),
        "package a;\n",
    )]));
    let err = r.calculated_packages().unwrap_err();
    assert!(err.to_string().contains("root package is not set"));
}
