//! External tool invocation.
//!
//! HTML-to-PDF conversion, PDF concatenation, version control, and the
//! documentation build all run as external programs. They are described by a
//! [`ToolCommand`] and executed through a [`CommandRunner`], so the fetch
//! logic can be exercised without the real tools installed.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

/// Lines of stderr kept in [`ToolError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started (usually not installed).
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{command}` exited with {}{}", status.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")), stderr_suffix(stderr))]
    Failed {
        /// The command line.
        command: String,
        /// Exit code, or `None` if killed by a signal.
        status: Option<i32>,
        /// Tail of the program's stderr.
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!(": {}", stderr.trim())
    }
}

/// A program invocation: program name, arguments, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// Creates a command for `program`, resolved through `PATH` when not a path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Adds a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Adds multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// The program name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The working directory, if set.
    #[must_use]
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Executes [`ToolCommand`]s.
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Runs `command` to completion, failing on a non-zero exit.
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

/// Runs commands as child processes of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    #[instrument(level = "debug", skip(self), fields(command = %command))]
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await.map_err(|source| ToolError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolError::Failed {
                command: command.to_string(),
                status: output.status.code(),
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }

        debug!(stdout_bytes = stdout.len(), "tool finished");
        Ok(ToolOutput { stdout, stderr })
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// Program names for the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Version control client.
    pub git: String,
    /// Build tool run inside cloned repositories.
    pub make: String,
    /// Converts one HTML page to one PDF: `<tool> <in.html> <out.pdf>`.
    pub html_to_pdf: String,
    /// Concatenates PDFs: `<tool> <in.pdf>... <out.pdf>`.
    pub pdf_concat: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            make: "make".to_string(),
            html_to_pdf: "wkhtmltopdf".to_string(),
            pdf_concat: "pdfunite".to_string(),
        }
    }
}
