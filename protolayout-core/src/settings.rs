//! Clap-free settings for the rewrite, compile and build pipelines.

use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

/// Settings for the rewrite pipeline and the chained rewrite steps.
#[derive(Debug, Clone)]
pub struct RewriteSettings {
    pub inputs: Vec<Utf8PathBuf>,
    pub root_package: Option<String>,
    /// Glob patterns for imports that stay untouched.
    pub extern_imports: Vec<String>,

    // Output
    pub output_root: Utf8PathBuf,
    pub dry_run: bool,
    pub force: bool,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            root_package: None,
            extern_imports: Vec::new(),
            output_root: Utf8PathBuf::from("."),
            dry_run: true,
            force: false,
        }
    }
}

/// Settings for the compile pipeline.
#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub protoc: Option<Utf8PathBuf>,
    pub includes: Vec<Utf8PathBuf>,
    pub files: Vec<Utf8PathBuf>,
    pub proto_package: Option<String>,
    pub output: Utf8PathBuf,
    pub options: Vec<String>,
    pub plugin_params: String,
    pub quiet: bool,
    pub dry_run: bool,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            protoc: None,
            includes: Vec::new(),
            files: Vec::new(),
            proto_package: None,
            output: Utf8PathBuf::from("."),
            options: Vec::new(),
            plugin_params: String::new(),
            quiet: false,
            dry_run: false,
        }
    }
}

/// Python flavor compiled by `build`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flavor {
    #[default]
    Python,
    Mypy,
    Better,
    Plus,
}

impl Flavor {
    pub const ALL: [Flavor; 4] = [Flavor::Python, Flavor::Mypy, Flavor::Better, Flavor::Plus];

    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Python => "python",
            Flavor::Mypy => "mypy",
            Flavor::Better => "better",
            Flavor::Plus => "plus",
        }
    }

    /// Compile option argument for this flavor.
    pub fn option(self) -> &'static str {
        match self {
            Flavor::Python => "py",
            Flavor::Mypy => "mypy",
            Flavor::Better => "better",
            Flavor::Plus => "plus",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flavor::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| {
                let names: Vec<&str> = Flavor::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown flavor '{}' (expected one of {})", s, names.join(", "))
            })
    }
}

/// Settings for `build`: rewrite includes under the root package, then
/// compile the rewritten tree.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub includes: Vec<Utf8PathBuf>,
    pub root_package: String,
    pub extern_imports: Vec<String>,
    /// Where rewritten sources go.
    pub build_dir: Utf8PathBuf,
    /// Where generated code goes.
    pub output: Utf8PathBuf,
    pub flavor: Flavor,
    pub protoc: Option<Utf8PathBuf>,
    pub plugin_params: String,
    pub quiet: bool,
    pub force: bool,
    pub dry_run: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            root_package: String::new(),
            extern_imports: Vec::new(),
            build_dir: Utf8PathBuf::from("build/proto"),
            output: Utf8PathBuf::from("build/lib"),
            flavor: Flavor::default(),
            protoc: None,
            plugin_params: String::new(),
            quiet: false,
            force: false,
            dry_run: false,
        }
    }
}
