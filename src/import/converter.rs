//! Turning a source file into markup text.

use std::fs;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, IoResultExt, Result};
use crate::util::decode_text;

/// How a source file becomes text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceConverter {
    /// Read the file as text.
    #[default]
    Passthrough,
    /// Run an external converter with the source path appended to `args`
    /// and read the text from its standard output.
    Command { program: String, args: Vec<String> },
}

impl SourceConverter {
    pub fn command(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        SourceConverter::Command {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `["unrtf", "--latex"]` → a command converter; an empty list is
    /// [`Passthrough`](SourceConverter::Passthrough).
    pub fn from_command_line(words: &[String]) -> Self {
        match words.split_first() {
            Some((program, args)) => Self::command(program.as_str(), args.iter().map(String::as_str)),
            None => SourceConverter::Passthrough,
        }
    }

    /// Produce the text of `path`.
    pub fn convert(&self, path: &Path) -> Result<String> {
        match self {
            SourceConverter::Passthrough => {
                let bytes = fs::read(path).at(path)?;
                Ok(decode_text(&bytes, None).into_owned())
            }
            SourceConverter::Command { program, args } => run_converter(program, args, path),
        }
    }
}

fn run_converter(program: &str, args: &[String], path: &Path) -> Result<String> {
    debug!("running {program} on {}", path.display());
    let output = Command::new(program)
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| Error::Input(format!("could not run converter '{program}': {e}")))?;

    let stdout = decode_text(&output.stdout, None);
    let stderr = decode_text(&output.stderr, None);

    if !output.status.success() {
        return Err(Error::Input(format!(
            "converter '{program}' failed on {} ({}): {}",
            path.display(),
            output.status,
            stderr.trim()
        )));
    }

    let reported = stderr
        .lines()
        .chain(stdout.lines())
        .find(|line| line.trim_start().starts_with("Error:"));
    if let Some(line) = reported {
        return Err(Error::Input(format!(
            "converter '{program}' reported an error on {}: {}",
            path.display(),
            line.trim()
        )));
    }

    Ok(stdout.into_owned())
}
