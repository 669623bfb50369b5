#![no_main]

//! Fuzz target for the package and import rewrite of a single file.
//!
//! Errors are fine (bad package names, unresolved imports); panics are not.

use camino::Utf8PathBuf;
use libfuzzer_sys::fuzz_target;
use protolayout_index::SchemaIndex;
use protolayout_rewrite::Rewriter;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let index = SchemaIndex::from_sources([
        ("src", "src/fuzz/input.proto", text),
        ("src", "src/fuzz/other.proto", "syntax = \"proto3\";\n"),
    ]);
    let Ok(mut rewriter) = Rewriter::with_root_package("fuzz.root") else {
        return;
    };
    rewriter.load(index);
    let _ = rewriter.set_extern_imports(&["google/protobuf/*"]);

    if rewriter.fix_packages().is_ok() {
        let _ = rewriter.fix_imports();
    }
    let _ = rewriter.content(&Utf8PathBuf::from("src/fuzz/input.proto"));
});
