//! External tool invocation.
//!
//! `tar` is run through [`Cmd`], which captures stderr so a failure carries
//! the tool's own diagnostic.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

/// Builder for one tool invocation.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    /// Replaces the default `'<program>' failed` prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            error_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// Command line as it would be typed, for debug logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion. A non-zero exit is an error carrying stderr.
    pub fn run(self) -> Result<()> {
        log::debug!("running: {}", self.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        if output.status.success() {
            return Ok(());
        }

        let prefix = self
            .error_prefix
            .unwrap_or_else(|| format!("'{}' failed", self.program));
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("{prefix} (exit code {code})");
        }
        bail!("{prefix} (exit code {code}):\n{stderr}")
    }
}

/// Full path of a program on PATH, if any.
pub fn which(program: &str) -> Option<String> {
    which::which(program)
        .ok()
        .map(|path| path.to_string_lossy().into_owned())
}

pub fn exists(program: &str) -> bool {
    which(program).is_some()
}
