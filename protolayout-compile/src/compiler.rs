use crate::error::CompileError;
use crate::options::resolve_options;
use camino::{Utf8Path, Utf8PathBuf};
use protolayout_index::find_schema_files;
use protolayout_types::PackageName;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use tracing::{debug, info, warn};

/// Environment variable naming the `protoc` executable.
pub const PROTOC_ENV: &str = "PROTOC";

/// What to compile and how.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Passed to `protoc` as `-I<dir>`.
    pub includes: Vec<Utf8PathBuf>,
    /// Files to compile. Empty means every `.proto` under the includes.
    pub files: Vec<Utf8PathBuf>,
    /// Narrows discovery to `<include>/<package dir>`.
    pub proto_package: Option<PackageName>,
    pub output: Utf8PathBuf,
    pub options: Vec<String>,
    pub plugin_params: String,
    pub quiet: bool,
}

impl Default for CompileRequest {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            files: Vec::new(),
            proto_package: None,
            output: Utf8PathBuf::from("."),
            options: Vec::new(),
            plugin_params: String::new(),
            quiet: false,
        }
    }
}

/// One `protoc` run for one compile option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocInvocation {
    pub option: &'static str,
    pub program: Utf8PathBuf,
    pub args: Vec<String>,
}

impl fmt::Display for ProtocInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Locate `protoc`: explicit path, then `$PROTOC`, then `$PATH`.
pub fn find_protoc(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf, CompileError> {
    find_protoc_in(
        explicit,
        std::env::var_os(PROTOC_ENV),
        std::env::var_os("PATH"),
    )
}

/// [`find_protoc`] with the environment passed in.
pub fn find_protoc_in(
    explicit: Option<&Utf8Path>,
    protoc_env: Option<OsString>,
    path_env: Option<OsString>,
) -> Result<Utf8PathBuf, CompileError> {
    if let Some(path) = explicit {
        debug!(protoc = %path, "using explicit protoc");
        return Ok(path.to_path_buf());
    }

    if let Some(value) = protoc_env
        && !value.is_empty()
    {
        let path = Utf8PathBuf::from_path_buf(value.into())
            .map_err(|p| anyhow::anyhow!("{} is not UTF-8: {}", PROTOC_ENV, p.display()))?;
        debug!(protoc = %path, "using protoc from {}", PROTOC_ENV);
        return Ok(path);
    }

    let exe = format!("protoc{}", std::env::consts::EXE_SUFFIX);
    let found = path_env.iter().flat_map(std::env::split_paths).find_map(|dir| {
        let candidate = dir.join(&exe);
        if candidate.is_file() {
            Utf8PathBuf::from_path_buf(candidate).ok()
        } else {
            None
        }
    });

    match found {
        Some(path) => {
            debug!(protoc = %path, "found protoc on PATH");
            Ok(path)
        }
        None => Err(CompileError::CompilerNotFound),
    }
}

/// Every `.proto` under `includes`, optionally narrowed to the directory of
/// `proto_package` inside each include. First occurrence wins on repeats.
pub fn discover_files(
    includes: &[Utf8PathBuf],
    proto_package: Option<&PackageName>,
) -> Result<Vec<Utf8PathBuf>, CompileError> {
    let mut out: Vec<Utf8PathBuf> = Vec::new();

    for include in includes {
        if !include.is_dir() {
            return Err(CompileError::MissingInclude {
                dir: include.clone(),
            });
        }

        let dir = match proto_package {
            Some(package) => include.join(package.to_dir()),
            None => include.clone(),
        };
        if !dir.is_dir() {
            debug!(dir = %dir, "no package directory under include");
            continue;
        }

        for path in find_schema_files(&dir)? {
            if !out.contains(&path) {
                out.push(path);
            }
        }
    }

    Ok(out)
}

/// Build the `protoc` runs for `request`, one per selected option.
///
/// Returns no runs (and logs a warning) when no option is selected or no
/// file is found.
pub fn plan_invocations(
    protoc: &Utf8Path,
    request: &CompileRequest,
) -> Result<Vec<ProtocInvocation>, CompileError> {
    let options = resolve_options(&request.options)?;
    if options.is_empty() {
        warn!("no compile options given; nothing will be compiled");
        return Ok(Vec::new());
    }

    let files = if request.files.is_empty() {
        discover_files(&request.includes, request.proto_package.as_ref())?
    } else {
        request.files.clone()
    };
    if files.is_empty() {
        warn!("no .proto files to compile");
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(options.len());
    for option in options {
        let mut args: Vec<String> = request
            .includes
            .iter()
            .map(|include| format!("-I{}", include))
            .collect();
        args.push(option.out_flag(
            request.output.as_str(),
            &request.plugin_params,
            request.quiet,
        ));
        args.extend(files.iter().map(|f| f.to_string()));

        info!(option = option.key, files = files.len(), "planned protoc run");
        out.push(ProtocInvocation {
            option: option.key,
            program: protoc.to_path_buf(),
            args,
        });
    }

    Ok(out)
}
