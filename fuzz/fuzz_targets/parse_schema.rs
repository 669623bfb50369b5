#![no_main]

//! Fuzz target for the .proto line scanner.
//!
//! Scanning arbitrary text must never panic, and rendering the scanned
//! file must give back the input byte for byte.

use camino::Utf8Path;
use libfuzzer_sys::fuzz_target;
use protolayout_index::SchemaIndex;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let index = SchemaIndex::from_sources([("src", "src/a/input.proto", text)]);
    let file = index
        .get(Utf8Path::new("src/a/input.proto"))
        .expect("indexed file");
    assert_eq!(file.render(), text);
});
