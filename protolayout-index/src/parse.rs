use protolayout_types::{
    ImportDecl, ImportLine, ImportModifier, PackageLine, PackageName, SourceLine,
};
use regex::Regex;
use std::sync::LazyLock;

static PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*package\s+)([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)(\s*;.*)$")
        .expect("package regex")
});

/// Double- or single-quoted path; the quote style is kept on render.
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*import\s+(?:(public|weak)\s+)?)(?:"([^"]*)"|'([^']*)')(\s*;.*)$"#)
        .expect("import regex")
});

/// Split schema text into lines, recognising `package` and `import`
/// statements. Rendering the result yields `text` unchanged.
///
/// Only the first `package` statement is treated as the declaration; any
/// later one stays plain text.
pub fn parse_schema(text: &str) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut seen_package = false;

    for raw in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(raw);

        if !seen_package
            && let Some(line) = parse_package(body, ending)
        {
            seen_package = true;
            out.push(line);
            continue;
        }

        if let Some(line) = parse_import(body, ending) {
            out.push(line);
            continue;
        }

        out.push(SourceLine::Text(raw.to_string()));
    }

    out
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}

fn parse_package(body: &str, ending: &str) -> Option<SourceLine> {
    let caps = PACKAGE.captures(body)?;
    let name: PackageName = caps[2].parse().ok()?;
    Some(SourceLine::Package(PackageLine {
        head: caps[1].to_string(),
        name,
        tail: format!("{}{}", &caps[3], ending),
    }))
}

fn parse_import(body: &str, ending: &str) -> Option<SourceLine> {
    let caps = IMPORT.captures(body)?;
    let modifier = caps.get(2).map(|m| match m.as_str() {
        "public" => ImportModifier::Public,
        _ => ImportModifier::Weak,
    });
    let (quote, path) = match (caps.get(3), caps.get(4)) {
        (Some(double), _) => ('"', double.as_str()),
        (None, Some(single)) => ('\'', single.as_str()),
        (None, None) => return None,
    };
    Some(SourceLine::Import(ImportLine {
        head: format!("{}{}", &caps[1], quote),
        decl: ImportDecl {
            path: path.to_string(),
            modifier,
        },
        tail: format!("{}{}{}", quote, &caps[5], ending),
    }))
}
