//! Rewrite, compile and build pipelines, extracted from the CLI.
//!
//! Process execution goes through [`CompilerPort`]; file reads and writes
//! go through the index and write crates.

use crate::ports::CompilerPort;
use crate::settings::{BuildSettings, CompileSettings, RewriteSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use protolayout_compile::{
    CompileError, CompileRequest, ProtocInvocation, find_protoc, plan_invocations, resolve_options,
};
use protolayout_rewrite::{PackageMapping, RewriteError, Rewriter};
use protolayout_types::{PackageName, WriteOutcome};
use protolayout_write::{WriteError, WriteOptions, write_index};
use tracing::{info, warn};

/// Error type for pipeline results. Exit code 2 = bad input, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    /// Bad or missing setting, reported like an unset root package.
    pub fn configuration(message: impl Into<String>) -> Self {
        ToolError::Rewrite(RewriteError::Configuration {
            message: message.into(),
        })
    }

    pub fn exit_code(&self) -> u8 {
        let runtime = match self {
            ToolError::Rewrite(e) => e.is_runtime(),
            ToolError::Write(e) => e.is_runtime(),
            ToolError::Compile(e) => e.is_runtime(),
            ToolError::Internal(_) => true,
        };
        if runtime { 1 } else { 2 }
    }
}

/// One step of a rewrite chain. Steps run left to right on one [`Rewriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Read(Vec<Utf8PathBuf>),
    FixPackages,
    FixImports,
    Content(Utf8PathBuf),
    CalculatedPackages,
    Write(WriteStep),
}

/// Per-step overrides of the write settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteStep {
    pub dry_run: Option<bool>,
    pub force: bool,
    pub output_root: Option<Utf8PathBuf>,
}

/// Output produced by a step, in step order.
#[derive(Debug, Clone)]
pub enum StepOutput {
    Content { path: Utf8PathBuf, text: String },
    Packages(PackageMapping),
    Written(WriteOutcome),
}

/// Run a chain of rewrite steps.
///
/// `settings.inputs` are read first when the chain does not start with a
/// `read` step of its own.
pub fn run_steps(
    settings: &RewriteSettings,
    steps: &[Step],
) -> Result<Vec<StepOutput>, ToolError> {
    let mut rewriter = configured_rewriter(settings)?;
    let mut outputs = Vec::new();

    if !matches!(steps.first(), Some(Step::Read(_))) && !settings.inputs.is_empty() {
        rewriter.read(&settings.inputs)?;
    }

    for step in steps {
        match step {
            Step::Read(dirs) => {
                rewriter.read(dirs)?;
            }
            Step::FixPackages => {
                rewriter.fix_packages()?;
            }
            Step::FixImports => {
                rewriter.fix_imports()?;
            }
            Step::Content(path) => outputs.push(StepOutput::Content {
                path: path.clone(),
                text: rewriter.content(path)?,
            }),
            Step::CalculatedPackages => {
                outputs.push(StepOutput::Packages(rewriter.calculated_packages()?));
            }
            Step::Write(step) => {
                let opts = WriteOptions {
                    output_root: step
                        .output_root
                        .clone()
                        .unwrap_or_else(|| settings.output_root.clone()),
                    dry_run: step.dry_run.unwrap_or(settings.dry_run),
                    force: step.force || settings.force,
                };
                outputs.push(StepOutput::Written(write_index(rewriter.index(), &opts)?));
            }
        }
    }

    Ok(outputs)
}

/// Outcome of `run_rewrite`.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub packages: PackageMapping,
    pub write: WriteOutcome,
}

/// Read, fix packages, fix imports, write.
pub fn run_rewrite(settings: &RewriteSettings) -> Result<RewriteOutcome, ToolError> {
    let mut rewriter = configured_rewriter(settings)?;
    rewriter.read(&settings.inputs)?;
    let packages = rewriter.calculated_packages()?;
    rewriter.fix_packages()?.fix_imports()?;

    let opts = WriteOptions {
        output_root: settings.output_root.clone(),
        dry_run: settings.dry_run,
        force: settings.force,
    };
    let write = write_index(rewriter.index(), &opts)?;
    Ok(RewriteOutcome { packages, write })
}

fn configured_rewriter(settings: &RewriteSettings) -> Result<Rewriter, RewriteError> {
    let mut rewriter = Rewriter::new();
    if let Some(root) = &settings.root_package {
        rewriter.set_root_package(root)?;
    }
    rewriter.set_extern_imports(&settings.extern_imports)?;
    Ok(rewriter)
}

/// Outcome of `run_compile`.
#[derive(Debug, Clone, Default)]
pub struct CompileOutcome {
    pub invocations: Vec<ProtocInvocation>,
    pub dry_run: bool,
}

/// Run `protoc` once per selected option.
///
/// In dry-run mode the commands are only logged, and a missing `protoc`
/// is tolerated.
pub fn run_compile(
    settings: &CompileSettings,
    compiler: &dyn CompilerPort,
) -> Result<CompileOutcome, ToolError> {
    let mut outcome = CompileOutcome {
        invocations: Vec::new(),
        dry_run: settings.dry_run,
    };

    if resolve_options(&settings.options)?.is_empty() {
        warn!("no compile options given; nothing will be compiled");
        return Ok(outcome);
    }

    let protoc = match find_protoc(settings.protoc.as_deref()) {
        Ok(path) => path,
        Err(CompileError::CompilerNotFound) if settings.dry_run => {
            warn!("protoc not found; showing commands with a bare `protoc`");
            Utf8PathBuf::from("protoc")
        }
        Err(e) => return Err(e.into()),
    };

    let proto_package = settings
        .proto_package
        .as_deref()
        .map(str::parse::<PackageName>)
        .transpose()
        .map_err(RewriteError::from)?;

    let request = CompileRequest {
        includes: settings.includes.clone(),
        files: settings.files.clone(),
        proto_package,
        output: settings.output.clone(),
        options: settings.options.clone(),
        plugin_params: settings.plugin_params.clone(),
        quiet: settings.quiet,
    };
    outcome.invocations = plan_invocations(&protoc, &request)?;

    if settings.dry_run {
        for invocation in &outcome.invocations {
            info!(command = %invocation, "dry-run: protoc not run");
        }
        return Ok(outcome);
    }

    if !outcome.invocations.is_empty() {
        ensure_dir(&settings.output)?;
    }
    for invocation in &outcome.invocations {
        info!(option = invocation.option, command = %invocation, "compiling");
        let code = compiler.run(invocation)?;
        if code != Some(0) {
            return Err(CompileError::CompilerFailed { code }.into());
        }
    }

    Ok(outcome)
}

fn ensure_dir(dir: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir))
}

/// Outcome of `run_build`.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub rewrite: RewriteOutcome,
    pub compile: CompileOutcome,
}

/// Rewrite `includes` under the root package into the build dir, then
/// compile the rewritten files for the chosen flavor.
pub fn run_build(
    settings: &BuildSettings,
    compiler: &dyn CompilerPort,
) -> Result<BuildOutcome, ToolError> {
    info!(
        root_package = %settings.root_package,
        flavor = %settings.flavor,
        "building"
    );

    let rewrite = run_rewrite(&RewriteSettings {
        inputs: settings.includes.clone(),
        root_package: Some(settings.root_package.clone()),
        extern_imports: settings.extern_imports.clone(),
        output_root: settings.build_dir.clone(),
        dry_run: settings.dry_run,
        force: settings.force,
    })?;

    let files: Vec<Utf8PathBuf> = rewrite
        .write
        .entries
        .iter()
        .map(|e| e.destination.clone())
        .collect();

    let compile = run_compile(
        &CompileSettings {
            protoc: settings.protoc.clone(),
            includes: vec![settings.build_dir.clone()],
            files,
            proto_package: Some(settings.root_package.clone()),
            output: settings.output.clone(),
            options: vec![settings.flavor.option().to_string()],
            plugin_params: settings.plugin_params.clone(),
            quiet: settings.quiet,
            dry_run: settings.dry_run,
        },
        compiler,
    )?;

    Ok(BuildOutcome { rewrite, compile })
}
