//! Parser for chained rewrite steps.
//!
//! `protolayout rewrite read src/proto fix_packages fix_imports write --no-dry-run`
//! runs each step left to right. Step names accept dashes or underscores.

use camino::Utf8PathBuf;
use protolayout_core::pipeline::{Step, WriteStep};
use thiserror::Error;

pub const STEP_NAMES: &[&str] = &[
    "read",
    "fix_packages",
    "fix_imports",
    "content",
    "calculated_packages",
    "write",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("no steps given (expected some of: {})", STEP_NAMES.join(", "))]
    Empty,

    #[error("unknown step '{0}' (expected one of: {steps})", steps = STEP_NAMES.join(", "))]
    Unknown(String),

    #[error("step '{step}' needs {expected}")]
    MissingArgument { step: &'static str, expected: &'static str },

    #[error("unexpected argument '{arg}' for step '{step}'")]
    UnexpectedArgument { step: &'static str, arg: String },
}

fn step_name(token: &str) -> Option<&'static str> {
    let normalized = token.replace('-', "_");
    STEP_NAMES.iter().copied().find(|s| *s == normalized)
}

/// Parse tokens into steps.
pub fn parse_steps<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Step>, StepError> {
    if tokens.is_empty() {
        return Err(StepError::Empty);
    }

    let mut steps = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_ref();
        let name = step_name(token).ok_or_else(|| StepError::Unknown(token.to_string()))?;
        i += 1;

        // Arguments run up to the next step name.
        let start = i;
        while i < tokens.len() && step_name(tokens[i].as_ref()).is_none() {
            i += 1;
        }
        let args: Vec<&str> = tokens[start..i].iter().map(AsRef::as_ref).collect();

        let step = match name {
            "read" => {
                if args.is_empty() {
                    return Err(StepError::MissingArgument {
                        step: "read",
                        expected: "at least one directory",
                    });
                }
                Step::Read(args.iter().map(Utf8PathBuf::from).collect())
            }
            "content" => match args.as_slice() {
                [path] => Step::Content(Utf8PathBuf::from(*path)),
                [] => {
                    return Err(StepError::MissingArgument {
                        step: "content",
                        expected: "a file path",
                    });
                }
                [_, extra, ..] => {
                    return Err(StepError::UnexpectedArgument {
                        step: "content",
                        arg: extra.to_string(),
                    });
                }
            },
            "write" => Step::Write(parse_write_args(&args)?),
            other => {
                if let Some(arg) = args.first() {
                    return Err(StepError::UnexpectedArgument {
                        step: other,
                        arg: arg.to_string(),
                    });
                }
                match other {
                    "fix_packages" => Step::FixPackages,
                    "fix_imports" => Step::FixImports,
                    _ => Step::CalculatedPackages,
                }
            }
        };
        steps.push(step);
    }

    Ok(steps)
}

fn parse_write_args(args: &[&str]) -> Result<WriteStep, StepError> {
    let mut out = WriteStep::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--dry-run" => out.dry_run = Some(true),
            "--no-dry-run" => out.dry_run = Some(false),
            "--force" => out.force = true,
            "--output-root" => {
                let dir = iter.next().ok_or(StepError::MissingArgument {
                    step: "write",
                    expected: "a directory after --output-root",
                })?;
                out.output_root = Some(Utf8PathBuf::from(*dir));
            }
            other => {
                if let Some(dir) = other.strip_prefix("--output-root=") {
                    out.output_root = Some(Utf8PathBuf::from(dir));
                } else {
                    return Err(StepError::UnexpectedArgument {
                        step: "write",
                        arg: other.to_string(),
                    });
                }
            }
        }
    }
    Ok(out)
}
