mod config;
mod steps;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::ConfigMerger;
use protolayout_compile::{COMPILE_OPTIONS, OPTION_GROUPS};
use protolayout_core::WriteOutcome;
use protolayout_core::adapters::ProcessCompiler;
use protolayout_core::pipeline::{StepOutput, ToolError, run_build, run_compile, run_steps};
use std::io::IsTerminal;
use std::process::ExitCode;
use steps::StepError;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "protolayout",
    version,
    about = "Rewrite .proto packages and imports into an enforced directory layout, then run protoc."
)]
struct Cli {
    /// Config file (default: ./protolayout.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run chained rewrite steps: read <dirs...>, fix_packages, fix_imports,
    /// content <path>, calculated_packages, write [--no-dry-run] [--force] [--output-root <dir>].
    Rewrite(RewriteArgs),
    /// Run protoc for one or more compile options.
    Compile(CompileArgs),
    /// Rewrite includes under a root package, then compile them for a python flavor.
    Build(BuildArgs),
    /// List the available compile options and groups.
    ListOptions(ListOptionsArgs),
}

#[derive(Debug, Parser)]
struct RewriteArgs {
    /// Root package every file is nested under (e.g. "foo").
    #[arg(long)]
    root_package: Option<String>,

    /// Glob for imports that are left untouched (repeatable).
    #[arg(long = "extern-import")]
    extern_imports: Vec<String>,

    /// Output root for `write` (default: current directory).
    #[arg(long)]
    output_root: Option<Utf8PathBuf>,

    /// Make `write` touch the disk unless a step says otherwise.
    #[arg(long, default_value_t = false)]
    no_dry_run: bool,

    /// Rewrite destinations even when their contents already match.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Output format for step results.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Steps, run left to right.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    steps: Vec<String>,
}

#[derive(Debug, Parser)]
struct CompileArgs {
    /// protoc executable (default: $PROTOC, then PATH).
    #[arg(long)]
    protoc: Option<Utf8PathBuf>,

    /// Include directory passed to protoc (repeatable).
    #[arg(short = 'I', long = "include")]
    includes: Vec<Utf8PathBuf>,

    /// Output directory for generated code (default: current directory).
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Compile option or group (repeatable); see `list-options`.
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,

    /// Only compile files under this package's directory in each include.
    #[arg(long)]
    proto_package: Option<String>,

    /// Extra parameters for the protoc plugin.
    #[arg(long)]
    plugin_params: Option<String>,

    /// Ask plugins to stay quiet.
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Only show the protoc commands.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Files to compile (default: every .proto under the includes).
    files: Vec<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct BuildArgs {
    #[arg(long)]
    root_package: Option<String>,

    /// Source directory to rewrite (repeatable).
    #[arg(short = 'I', long = "include")]
    includes: Vec<Utf8PathBuf>,

    #[arg(long = "extern-import")]
    extern_imports: Vec<String>,

    /// Directory for rewritten sources (default: build/proto).
    #[arg(long)]
    build_dir: Option<Utf8PathBuf>,

    /// Directory for generated code (default: build/lib).
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// python, mypy, better or plus.
    #[arg(long)]
    flavor: Option<String>,

    #[arg(long)]
    protoc: Option<Utf8PathBuf>,

    #[arg(long)]
    plugin_params: Option<String>,

    #[arg(long, default_value_t = false)]
    quiet: bool,

    #[arg(long, default_value_t = false)]
    force: bool,

    /// Show what would be written and run, change nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct ListOptionsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    if let Err(e) = real_main() {
        error!("{:#}", e);
        return ExitCode::from(exit_code(&e));
    }
    ExitCode::from(0)
}

/// 2 for bad input, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(tool) = err.downcast_ref::<ToolError>() {
        tool.exit_code()
    } else if err.downcast_ref::<StepError>().is_some() {
        2
    } else {
        1
    }
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file_config = config::load_or_default(cli.config.as_deref(), camino::Utf8Path::new("."))
        .context("load protolayout.toml config")?;
    let merger = ConfigMerger::new(file_config);

    match cli.cmd {
        Command::Rewrite(args) => cmd_rewrite(merger, args),
        Command::Compile(args) => cmd_compile(merger, args),
        Command::Build(args) => cmd_build(merger, args),
        Command::ListOptions(args) => cmd_list_options(args),
    }
}

fn cmd_rewrite(merger: ConfigMerger, args: RewriteArgs) -> anyhow::Result<()> {
    let steps = steps::parse_steps(&args.steps)?;
    let settings = merger.merge_rewrite_args(&args);
    debug!(
        "merged config: root_package={:?}, extern_imports={:?}, output_root={}, dry_run={}",
        settings.root_package, settings.extern_imports, settings.output_root, settings.dry_run
    );

    let outputs = run_steps(&settings, &steps)?;
    for output in &outputs {
        match args.format {
            OutputFormat::Text => print_step_text(output),
            OutputFormat::Json => print_step_json(output)?,
        }
    }
    Ok(())
}

fn print_step_text(output: &StepOutput) {
    match output {
        StepOutput::Content { text, .. } => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
        StepOutput::Packages(packages) => {
            for (path, package) in packages {
                println!("{}\t{}", path, package);
            }
        }
        StepOutput::Written(outcome) => print_write_text(outcome),
    }
}

fn print_write_text(outcome: &WriteOutcome) {
    for entry in &outcome.entries {
        let status = serde_json::to_value(entry.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        println!("{:<10} {} -> {}", status, entry.source, entry.destination);
    }
    if outcome.dry_run {
        print!("{}", outcome.patch);
        println!("dry-run: nothing written (use `write --no-dry-run`)");
    } else {
        info!(
            written = outcome.summary.written,
            unchanged = outcome.summary.unchanged,
            "wrote to {}",
            outcome.output_root
        );
    }
}

fn print_step_json(output: &StepOutput) -> anyhow::Result<()> {
    let value = match output {
        StepOutput::Content { path, text } => serde_json::json!({
            "path": path,
            "content": text,
        }),
        StepOutput::Packages(packages) => serde_json::to_value(packages)?,
        StepOutput::Written(outcome) => serde_json::to_value(outcome)?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_compile(merger: ConfigMerger, args: CompileArgs) -> anyhow::Result<()> {
    let settings = merger.merge_compile_args(&args);
    debug!(
        "merged config: options={:?}, includes={:?}, output={}",
        settings.options, settings.includes, settings.output
    );

    let outcome = run_compile(&settings, &ProcessCompiler)?;
    if outcome.dry_run {
        for invocation in &outcome.invocations {
            println!("{}", invocation);
        }
    }
    Ok(())
}

fn cmd_build(merger: ConfigMerger, args: BuildArgs) -> anyhow::Result<()> {
    let settings = merger.merge_build_args(&args)?;
    let outcome = run_build(&settings, &ProcessCompiler)?;

    if settings.dry_run {
        print_write_text(&outcome.rewrite.write);
        for invocation in &outcome.compile.invocations {
            println!("{}", invocation);
        }
    } else {
        info!(
            files = outcome.rewrite.write.summary.files,
            runs = outcome.compile.invocations.len(),
            "built {} into {}",
            settings.root_package,
            settings.output
        );
    }
    Ok(())
}

fn cmd_list_options(args: ListOptionsArgs) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Text => {
            println!("Compile options:\n");
            println!(
                "  {:<10} {:<14} {:<20} DESCRIPTION",
                "ARGUMENT", "KEY", "PLUGIN"
            );
            println!(
                "  {:<10} {:<14} {:<20} -----------",
                "--------", "---", "------"
            );
            for option in COMPILE_OPTIONS {
                println!(
                    "  {:<10} {:<14} {:<20} {}",
                    option.argument.unwrap_or("-"),
                    option.key,
                    option.plugin,
                    option.description
                );
            }
            println!("\nGroups:\n");
            for group in OPTION_GROUPS {
                println!("  {:<10} {}", group.argument, group.members.join(", "));
            }
            println!();
            println!("Use 'protolayout compile -o <argument>' to select options.");
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "options": COMPILE_OPTIONS,
                "groups": OPTION_GROUPS,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
