//! Golden fixture tests for the rewrite and build pipelines.
//!
//! Each fixture under `tests/fixtures/<name>/` contains:
//!
//! - `input/` - the source tree handed to `read`
//! - `expected/` - the output tree after rewriting under the fixture's root package

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pretty_assertions::assert_eq;
use protolayout_core::adapters::RecordingCompiler;
use protolayout_core::pipeline::{Step, StepOutput, WriteStep, run_build, run_rewrite, run_steps};
use protolayout_core::settings::{BuildSettings, Flavor, RewriteSettings};
use protolayout_core::WriteStatus;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn fixture_dir(name: &str) -> Utf8PathBuf {
    // Fixtures are at workspace root: ../tests/fixtures relative to protolayout-core
    let manifest_dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = manifest_dir
        .parent()
        .expect("workspace root")
        .join("tests")
        .join("fixtures")
        .join(name);
    assert!(path.exists(), "Fixture directory does not exist: {}", path);
    path
}

/// Every file below `root`, keyed by its path relative to `root`.
fn read_tree(root: &Utf8Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).expect("read dir") {
            let path = Utf8PathBuf::from_path_buf(entry.expect("entry").path()).expect("utf8");
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().as_str().replace('\\', "/");
                out.insert(rel, fs::read_to_string(&path).expect("read file"));
            }
        }
    }
    out
}

fn temp_out(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("out")).expect("utf8")
}

fn run_fixture_test(name: &str, root_package: &str) {
    let fixture = fixture_dir(name);
    let temp = TempDir::new().expect("create temp dir");
    let out = temp_out(&temp);

    let settings = RewriteSettings {
        inputs: vec![fixture.join("input")],
        root_package: Some(root_package.to_string()),
        extern_imports: vec!["google/protobuf/*".to_string()],
        output_root: out.clone(),
        dry_run: false,
        force: false,
    };
    let outcome = run_rewrite(&settings).expect("rewrite");
    assert_eq!(outcome.write.summary.written, outcome.write.summary.files);

    let expected = read_tree(&fixture.join("expected"));
    let actual = read_tree(&out);
    assert_eq!(actual, expected);

    // A second run finds every destination up to date.
    let again = run_rewrite(&settings).expect("rewrite again");
    assert_eq!(again.write.summary.unchanged, again.write.summary.files);
    assert!(again.write.patch.is_empty());
}

#[test]
fn fixture_namespaced() {
    run_fixture_test("namespaced", "foo");
}

#[test]
fn fixture_overlap() {
    run_fixture_test("overlap", "foo.namespace");
}

#[test]
fn calculated_packages_match_output_layout() {
    let fixture = fixture_dir("namespaced");
    let input = fixture.join("input");
    let settings = RewriteSettings {
        root_package: Some("foo".to_string()),
        ..RewriteSettings::default()
    };

    let outputs = run_steps(
        &settings,
        &[Step::Read(vec![input.clone()]), Step::CalculatedPackages],
    )
    .expect("steps");
    let [StepOutput::Packages(packages)] = outputs.as_slice() else {
        panic!("expected a single package mapping");
    };

    let subscription = input.join("services/request/subscription.proto");
    assert_eq!(
        packages[&subscription].to_string(),
        "foo.namespace.services.request"
    );
    assert_eq!(
        packages[&input.join("legacy/flags.proto")].to_string(),
        "foo.legacy"
    );
}

#[test]
fn chained_steps_dry_run_writes_nothing() {
    let fixture = fixture_dir("namespaced");
    let temp = TempDir::new().expect("create temp dir");
    let out = temp_out(&temp);
    let input = fixture.join("input");

    let settings = RewriteSettings {
        root_package: Some("foo".to_string()),
        extern_imports: vec!["google/protobuf/*".to_string()],
        output_root: out.clone(),
        ..RewriteSettings::default()
    };
    let outputs = run_steps(
        &settings,
        &[
            Step::Read(vec![input.clone()]),
            Step::FixPackages,
            Step::FixImports,
            Step::Content(input.join("common/ids.proto")),
            Step::Write(WriteStep::default()),
        ],
    )
    .expect("steps");

    match &outputs[0] {
        StepOutput::Content { text, .. } => {
            assert!(text.contains("package foo.namespace.common;  // shared identifiers"))
        }
        other => panic!("unexpected output: {other:?}"),
    }
    match &outputs[1] {
        StepOutput::Written(outcome) => {
            assert!(outcome.dry_run);
            assert!(
                outcome
                    .entries
                    .iter()
                    .all(|e| e.status == WriteStatus::DryRun)
            );
            assert!(outcome.patch.contains("+++ b/foo/legacy/flags.proto"));
        }
        other => panic!("unexpected output: {other:?}"),
    }
    assert!(!out.exists());
}

#[test]
fn unresolved_import_stops_the_chain() {
    let fixture = fixture_dir("namespaced");
    let settings = RewriteSettings {
        root_package: Some("foo".to_string()),
        ..RewriteSettings::default()
    };

    // Without the extern pattern, google/protobuf/timestamp.proto is unknown.
    let err = run_steps(
        &settings,
        &[
            Step::Read(vec![fixture.join("input")]),
            Step::FixPackages,
            Step::FixImports,
        ],
    )
    .expect_err("unresolved");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("google/protobuf/timestamp.proto"));
}

#[test]
fn build_rewrites_then_compiles_the_rewritten_tree() {
    let fixture = fixture_dir("namespaced");
    let temp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    let compiler = RecordingCompiler::new();

    let settings = BuildSettings {
        includes: vec![fixture.join("input")],
        root_package: "foo".to_string(),
        extern_imports: vec!["google/protobuf/*".to_string()],
        build_dir: root.join("build/proto"),
        output: root.join("build/lib"),
        flavor: Flavor::Better,
        protoc: Some(Utf8PathBuf::from("/usr/bin/protoc")),
        quiet: true,
        ..BuildSettings::default()
    };
    let outcome = run_build(&settings, &compiler).expect("build");

    assert!(
        root.join("build/proto/foo/namespace/services/request/subscription.proto")
            .is_file()
    );
    assert!(root.join("build/lib").is_dir());

    let runs = compiler.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs, outcome.compile.invocations);
    assert_eq!(runs[0].option, "betterproto");
    assert_eq!(runs[0].program, Utf8PathBuf::from("/usr/bin/protoc"));
    assert_eq!(runs[0].args[0], format!("-I{}", root.join("build/proto")));
    assert_eq!(
        runs[0].args[1],
        format!("--python_betterproto_out=quiet:{}", root.join("build/lib"))
    );
    assert_eq!(runs[0].args.len(), 2 + 4);
}

#[test]
fn failing_protoc_is_a_tool_error() {
    let fixture = fixture_dir("overlap");
    let temp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    let compiler = RecordingCompiler::failing(1);

    let settings = BuildSettings {
        includes: vec![fixture.join("input")],
        root_package: "foo.namespace".to_string(),
        build_dir: root.join("build/proto"),
        output: root.join("build/lib"),
        protoc: Some(Utf8PathBuf::from("protoc")),
        ..BuildSettings::default()
    };
    let err = run_build(&settings, &compiler).expect_err("protoc failed");
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("status 1"));
}
