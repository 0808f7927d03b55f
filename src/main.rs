//! CLI entry point for specfetch.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use specfetch_core::{
    ExitOutcome, FetchContext, Fetcher, HttpClient, Manifest, ReleaseClient, RunObserver,
    ScratchDir, SystemRunner, default_output_dir,
};
use tracing::{debug, error, info, warn};

mod cli;
mod output;
mod progress;
mod terminal;

use cli::Args;
use progress::EntryProgress;

/// Process exit status classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every selected entry succeeded.
    Success,
    /// Some entries succeeded.
    Partial,
    /// Nothing succeeded, or setup failed.
    Failure,
    /// Stopped by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
            Self::Interrupted => 130,
        }
    }
}

impl From<ExitOutcome> for ProcessExit {
    fn from(outcome: ExitOutcome) -> Self {
        match outcome {
            ExitOutcome::Success => Self::Success,
            ExitOutcome::Partial => Self::Partial,
            ExitOutcome::Failure => Self::Failure,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::plain_output(args.no_color);
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(e) => {
            error!(error = %format!("{e:#}"), "specfetch failed");
            eprintln!("error: {e:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let manifest = Manifest::builtin()
        .context("built-in manifest is invalid")?
        .select(&args.only)?;

    if args.list {
        output::print_manifest(&manifest);
        return Ok(ProcessExit::Success);
    }

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => default_output_dir()?,
    };
    let scratch = match &args.work_dir {
        Some(dir) => ScratchDir::persistent(dir)?,
        None => ScratchDir::ephemeral()?,
    };
    let ctx = FetchContext::new(&output_dir, scratch)?;

    let http = HttpClient::with_settings(args.http_settings())
        .context("failed to build the HTTP client")?;
    let mut releases = ReleaseClient::new(http.clone()).with_token(env_var("GITHUB_TOKEN"));
    if let Some(api_base) = env_var("GITHUB_API_URL") {
        debug!(api_base = %api_base, "using GitHub API override");
        releases = releases.with_api_base(api_base);
    }

    let progress = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    )
    .then(|| Arc::new(EntryProgress::new(manifest.len())));

    let mut fetcher = Fetcher::new(
        http,
        releases,
        Arc::new(SystemRunner),
        args.toolchain(),
        args.fetch_options(),
    );
    if let Some(progress) = &progress {
        fetcher = fetcher.with_observer(Arc::clone(progress) as Arc<dyn RunObserver>);
    }

    info!(
        entries = manifest.len(),
        output_dir = %ctx.output_dir().display(),
        scratch = %ctx.scratch_dir().display(),
        "specfetch starting"
    );

    let report = tokio::select! {
        report = fetcher.run(&manifest, &ctx) => Some(report),
        () = wait_for_interrupt() => None,
    };

    if let Some(progress) = &progress {
        progress.finish();
    }

    let Some(report) = report else {
        warn!("interrupted, removing partial downloads and scratch files");
        let removed = ctx.remove_partial_outputs(&manifest);
        debug!(removed, "partial outputs removed");
        close_context(ctx);
        return Ok(ProcessExit::Interrupted);
    };

    if !args.quiet {
        output::print_summary(&report, &output_dir);
    }
    close_context(ctx);

    Ok(report.exit_outcome().into())
}

/// Resolves when Ctrl-C is pressed; never resolves if the handler cannot be installed.
async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn close_context(ctx: FetchContext) {
    let scratch: PathBuf = ctx.scratch_dir().to_path_buf();
    if let Err(e) = ctx.close() {
        warn!(scratch = %scratch.display(), error = %e, "scratch directory left behind");
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Partial.code(), 1);
        assert_eq!(ProcessExit::Failure.code(), 2);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }

    #[test]
    fn test_exit_outcome_maps_to_process_exit() {
        assert_eq!(ProcessExit::from(ExitOutcome::Success), ProcessExit::Success);
        assert_eq!(ProcessExit::from(ExitOutcome::Partial), ProcessExit::Partial);
        assert_eq!(ProcessExit::from(ExitOutcome::Failure), ProcessExit::Failure);
    }
}
