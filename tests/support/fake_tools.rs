//! In-process stand-ins for git, make, wkhtmltopdf and pdfunite.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use specfetch_core::{CommandRunner, ToolCommand, ToolError, ToolOutput};

/// Records every command and simulates the tools on the filesystem.
///
/// - `git clone <url> <dir>` creates `<dir>/.git`.
/// - `git pull` succeeds without changes.
/// - `make` writes `make_output` (relative to its working directory), if set.
/// - `wkhtmltopdf <in> <out>` writes `<page:FILE_NAME>` into `<out>`, failing for
///   inputs whose file name is in `failing_pages`.
/// - `pdfunite <in>... <out>` writes the inputs' contents joined by newlines.
#[derive(Debug, Default)]
pub struct FakeTools {
    pub make_output: Option<(PathBuf, Vec<u8>)>,
    pub failing_pages: HashSet<String>,
    commands: Mutex<Vec<ToolCommand>>,
}

#[allow(dead_code)]
impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_make_output(mut self, relative: impl Into<PathBuf>, contents: &[u8]) -> Self {
        self.make_output = Some((relative.into(), contents.to_vec()));
        self
    }

    pub fn failing_page(mut self, file_name: &str) -> Self {
        self.failing_pages.insert(file_name.to_string());
        self
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// First argument of every command run with `program`.
    pub fn subcommands(&self, program: &str) -> Vec<String> {
        self.commands()
            .iter()
            .filter(|c| c.program() == program)
            .filter_map(|c| c.get_args().first().cloned())
            .collect()
    }

    fn failed(command: &ToolCommand, stderr: &str) -> ToolError {
        ToolError::Failed {
            command: command.to_string(),
            status: Some(1),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        self.commands.lock().unwrap().push(command.clone());
        let args = command.get_args();

        match command.program() {
            "git" => {
                if args.first().map(String::as_str) == Some("clone") {
                    let dest = Path::new(args.last().unwrap());
                    std::fs::create_dir_all(dest.join(".git")).unwrap();
                    std::fs::write(dest.join("README"), b"abi sources").unwrap();
                }
            }
            "make" => {
                if let Some((relative, contents)) = &self.make_output {
                    let cwd = command.get_cwd().unwrap();
                    let target = cwd.join(relative);
                    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
                    std::fs::write(target, contents).unwrap();
                }
            }
            "wkhtmltopdf" => {
                let input = Path::new(&args[0]);
                let name = input.file_name().unwrap().to_string_lossy().into_owned();
                if self.failing_pages.contains(&name) {
                    return Err(Self::failed(command, "Exit with code 1 due to network error"));
                }
                assert!(input.exists(), "converter input missing: {}", input.display());
                std::fs::write(&args[1], format!("<page:{name}>")).unwrap();
            }
            "pdfunite" => {
                let (output, inputs) = args.split_last().unwrap();
                let parts: Vec<String> = inputs
                    .iter()
                    .map(|i| std::fs::read_to_string(i).unwrap())
                    .collect();
                std::fs::write(output, parts.join("\n")).unwrap();
            }
            other => {
                return Err(ToolError::Spawn {
                    command: command.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{other}: not installed"),
                    ),
                });
            }
        }

        Ok(ToolOutput::default())
    }
}
