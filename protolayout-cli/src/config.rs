//! Configuration file loading for protolayout.
//!
//! Discovers and loads `protolayout.toml` from the working directory (or an
//! explicit `--config` path) and merges it with CLI arguments. CLI wins;
//! list arguments extend the file's lists.

use crate::{BuildArgs, CompileArgs, RewriteArgs};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use protolayout_core::pipeline::ToolError;
use protolayout_core::settings::{BuildSettings, CompileSettings, Flavor, RewriteSettings};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "protolayout.toml";

/// Top-level configuration from protolayout.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtolayoutConfig {
    pub rewrite: RewriteConfig,
    pub compile: CompileConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    pub root_package: Option<String>,
    pub inputs: Vec<Utf8PathBuf>,
    pub output_root: Option<Utf8PathBuf>,
    /// Imports matching these globs are left untouched (e.g. `google/protobuf/*`).
    pub extern_imports: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
    pub protoc: Option<Utf8PathBuf>,
    pub includes: Vec<Utf8PathBuf>,
    pub proto_package: Option<String>,
    pub output: Option<Utf8PathBuf>,
    pub options: Vec<String>,
    pub plugin_params: Option<String>,
    pub quiet: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub build_dir: Option<Utf8PathBuf>,
    pub flavor: Option<String>,
}

/// Discover protolayout.toml in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<ProtolayoutConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ProtolayoutConfig> {
    let config: ProtolayoutConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config, or the one in `dir`, or defaults.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    dir: &Utf8Path,
) -> anyhow::Result<ProtolayoutConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(ProtolayoutConfig::default()),
    }
}

fn extend_unique<T: Clone + PartialEq>(base: &mut Vec<T>, extra: &[T]) {
    for item in extra {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: ProtolayoutConfig,
}

impl ConfigMerger {
    pub fn new(config: ProtolayoutConfig) -> Self {
        Self { config }
    }

    pub fn merge_rewrite_args(self, args: &RewriteArgs) -> RewriteSettings {
        let file = self.config.rewrite;
        let mut extern_imports = file.extern_imports;
        extend_unique(&mut extern_imports, &args.extern_imports);

        let defaults = RewriteSettings::default();
        RewriteSettings {
            inputs: file.inputs,
            root_package: args.root_package.clone().or(file.root_package),
            extern_imports,
            output_root: args
                .output_root
                .clone()
                .or(file.output_root)
                .unwrap_or(defaults.output_root),
            dry_run: !args.no_dry_run,
            force: args.force,
        }
    }

    pub fn merge_compile_args(self, args: &CompileArgs) -> CompileSettings {
        let file = self.config.compile;
        let mut includes = file.includes;
        extend_unique(&mut includes, &args.includes);

        // CLI options replace the file's selection rather than adding to it.
        let options = if args.options.is_empty() {
            file.options
        } else {
            args.options.clone()
        };

        let defaults = CompileSettings::default();
        CompileSettings {
            protoc: args.protoc.clone().or(file.protoc),
            includes,
            files: args.files.clone(),
            proto_package: args.proto_package.clone().or(file.proto_package),
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or(defaults.output),
            options,
            plugin_params: args
                .plugin_params
                .clone()
                .or(file.plugin_params)
                .unwrap_or_default(),
            quiet: args.quiet || file.quiet,
            dry_run: args.dry_run,
        }
    }

    pub fn merge_build_args(self, args: &BuildArgs) -> Result<BuildSettings, ToolError> {
        let ProtolayoutConfig {
            rewrite,
            compile,
            build,
        } = self.config;

        let mut includes = if rewrite.inputs.is_empty() {
            compile.includes
        } else {
            rewrite.inputs
        };
        extend_unique(&mut includes, &args.includes);

        let mut extern_imports = rewrite.extern_imports;
        extend_unique(&mut extern_imports, &args.extern_imports);

        let root_package = args
            .root_package
            .clone()
            .or(rewrite.root_package)
            .ok_or_else(|| {
                ToolError::configuration(
                    "build needs a root package (--root-package or [rewrite] root_package)",
                )
            })?;

        let flavor = match args.flavor.clone().or(build.flavor) {
            Some(name) => name.parse::<Flavor>().map_err(ToolError::configuration)?,
            None => Flavor::default(),
        };

        let defaults = BuildSettings::default();
        Ok(BuildSettings {
            includes,
            root_package,
            extern_imports,
            build_dir: args
                .build_dir
                .clone()
                .or(build.build_dir)
                .unwrap_or(defaults.build_dir),
            output: args
                .output
                .clone()
                .or(compile.output)
                .unwrap_or(defaults.output),
            flavor,
            protoc: args.protoc.clone().or(compile.protoc),
            plugin_params: args
                .plugin_params
                .clone()
                .or(compile.plugin_params)
                .unwrap_or_default(),
            quiet: args.quiet || compile.quiet,
            force: args.force,
            dry_run: args.dry_run,
        })
    }
}
