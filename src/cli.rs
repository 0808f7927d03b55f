//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use specfetch_core::{FetchOptions, HttpSettings, Toolchain};

/// Fetch ABI and ELF specification documents.
///
/// Downloads the built-in list of processor supplements and ELF references
/// into one directory. Static files are downloaded directly, release assets
/// are pulled from GitHub, HTML books are rendered into a single PDF, and
/// documents kept in Git are cloned and built locally.
#[derive(Parser, Debug)]
#[command(name = "specfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory the documents are written to [default: directory of the executable]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Keep clones and intermediate files here instead of a temporary directory
    #[arg(short = 'w', long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Fetch only the entry with this label (repeatable)
    #[arg(long, value_name = "LABEL")]
    pub only: Vec<String>,

    /// Print the manifest and exit
    #[arg(long)]
    pub list: bool,

    /// Entries fetched in parallel (1-16)
    #[arg(short = 'c', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    /// Stop starting new entries after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds, including the body (1-3600)
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Maximum HTML pages mirrored per book (1-10000)
    #[arg(long, default_value_t = 512, value_parser = clap::value_parser!(u32).range(1..=10000))]
    pub max_pages: u32,

    /// Version control program
    #[arg(long, value_name = "PROGRAM", default_value = "git")]
    pub git: String,

    /// Build program run inside cloned repositories
    #[arg(long, value_name = "PROGRAM", default_value = "make")]
    pub make: String,

    /// HTML-to-PDF converter, invoked as `<PROGRAM> <in.html> <out.pdf>`
    #[arg(long, value_name = "PROGRAM", default_value = "wkhtmltopdf")]
    pub html_to_pdf: String,

    /// PDF concatenation program, invoked as `<PROGRAM> <in.pdf>... <out.pdf>`
    #[arg(long, value_name = "PROGRAM", default_value = "pdfunite")]
    pub pdf_concat: String,

    /// Disable colored log output (also honored via NO_COLOR)
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Default log level from -q/-v; `RUST_LOG` overrides it.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// HTTP timeout settings.
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout_secs: self.connect_timeout,
            read_timeout_secs: self.timeout,
        }
    }

    /// External program names.
    #[must_use]
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            git: self.git.clone(),
            make: self.make.clone(),
            html_to_pdf: self.html_to_pdf.clone(),
            pdf_concat: self.pdf_concat.clone(),
        }
    }

    /// Scheduling options.
    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            concurrency: usize::from(self.concurrency),
            fail_fast: self.fail_fast,
            max_pages: self.max_pages as usize,
        }
    }
}
