//! Registry of compile options for `protoc`.
//!
//! Each option names the plugin that handles it (`--<plugin>_out`) and the
//! fixed plugin parameters it needs. Groups (`js`, `python`, `all`) expand
//! to several options.

use crate::error::CompileError;
use serde::Serialize;

/// One output flavor `protoc` can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileOption {
    /// Registry key (e.g. "js-library").
    pub key: &'static str,
    /// Short argument accepted on the command line, if the option has one.
    pub argument: Option<&'static str>,
    /// Plugin name used to build `--<plugin>_out`.
    pub plugin: &'static str,
    /// Plugin parameters this option always passes.
    pub params: &'static [&'static str],
    pub description: &'static str,
}

/// Named set of options selected by one argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub argument: &'static str,
    pub members: &'static [&'static str],
    pub description: &'static str,
}

pub static COMPILE_OPTIONS: &[CompileOption] = &[
    CompileOption {
        key: "java",
        argument: Some("java"),
        plugin: "java",
        params: &[],
        description: "java",
    },
    CompileOption {
        key: "js-library",
        argument: None,
        plugin: "js",
        params: &["library=protobuf_library", "binary"],
        description: "javascript as library",
    },
    CompileOption {
        key: "js-individual",
        argument: None,
        plugin: "js",
        params: &["import_style=commonjs", "binary"],
        description: "javascript individual",
    },
    CompileOption {
        key: "csharp",
        argument: Some("cs"),
        plugin: "csharp",
        params: &[],
        description: "csharp",
    },
    CompileOption {
        key: "cpp",
        argument: Some("cpp"),
        plugin: "cpp",
        params: &[],
        description: "cpp",
    },
    CompileOption {
        key: "betterproto",
        argument: Some("better"),
        plugin: "python_betterproto",
        params: &[],
        description: "python with `betterproto` plugin",
    },
    CompileOption {
        key: "mypy",
        argument: Some("mypy"),
        plugin: "mypy",
        params: &[],
        description: "mypy python stubs",
    },
    CompileOption {
        key: "proto-plus",
        argument: Some("plus"),
        plugin: "proto-plus",
        params: &[],
        description: "python with `proto-plus` plugin",
    },
    CompileOption {
        key: "python",
        argument: Some("py"),
        plugin: "python",
        params: &[],
        description: "python",
    },
];

pub static OPTION_GROUPS: &[OptionGroup] = &[
    OptionGroup {
        argument: "js",
        members: &["js-library", "js-individual"],
        description: "both javascript flavors",
    },
    OptionGroup {
        argument: "python",
        members: &["betterproto", "mypy", "proto-plus", "python"],
        description: "every python flavor",
    },
    OptionGroup {
        argument: "all",
        members: &[
            "java",
            "js-library",
            "js-individual",
            "csharp",
            "cpp",
            "betterproto",
            "mypy",
            "proto-plus",
            "python",
        ],
        description: "every option",
    },
];

impl CompileOption {
    /// Plugin parameter string: user params, then the option's own params,
    /// then `quiet`.
    pub fn parameters(&self, plugin_params: &str, quiet: bool) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !plugin_params.is_empty() {
            parts.push(plugin_params);
        }
        parts.extend(self.params.iter().copied());
        if quiet {
            parts.push("quiet");
        }
        parts.join(",")
    }

    /// `--<plugin>_out=<params>:<output>`, or `--<plugin>_out=<output>` when
    /// there are no params.
    pub fn out_flag(&self, output: &str, plugin_params: &str, quiet: bool) -> String {
        let params = self.parameters(plugin_params, quiet);
        if params.is_empty() {
            format!("--{}_out={}", self.plugin, output)
        } else {
            format!("--{}_out={}:{}", self.plugin, params, output)
        }
    }
}

/// Look up a single option by argument or key.
pub fn lookup_option(query: &str) -> Option<&'static CompileOption> {
    let query = query.trim().to_lowercase().replace('_', "-");
    COMPILE_OPTIONS
        .iter()
        .find(|o| o.argument == Some(query.as_str()) || o.key == query)
}

/// Every argument accepted by [`resolve_options`].
pub fn accepted_arguments() -> Vec<&'static str> {
    COMPILE_OPTIONS
        .iter()
        .filter_map(|o| o.argument)
        .chain(OPTION_GROUPS.iter().map(|g| g.argument))
        .collect()
}

/// Expand arguments into options, in registry order and without repeats.
pub fn resolve_options<S: AsRef<str>>(
    arguments: &[S],
) -> Result<Vec<&'static CompileOption>, CompileError> {
    let mut selected = vec![false; COMPILE_OPTIONS.len()];

    for arg in arguments {
        let arg = arg.as_ref();
        let normalized = arg.trim().to_lowercase();

        let keys: Vec<&str> =
            if let Some(group) = OPTION_GROUPS.iter().find(|g| g.argument == normalized) {
                group.members.to_vec()
            } else if let Some(option) = lookup_option(arg) {
                vec![option.key]
            } else {
                return Err(CompileError::UnknownOption {
                    option: arg.to_string(),
                    accepted: accepted_arguments().join(", "),
                });
            };

        for key in keys {
            if let Some(pos) = COMPILE_OPTIONS.iter().position(|o| o.key == key) {
                selected[pos] = true;
            }
        }
    }

    Ok(COMPILE_OPTIONS
        .iter()
        .zip(selected)
        .filter_map(|(o, on)| on.then_some(o))
        .collect())
}
