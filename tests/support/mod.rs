#![allow(dead_code)]

pub mod fake_tools;
pub mod socket_guard;

use std::path::Path;
use std::sync::Arc;

use specfetch_core::{
    CommandRunner, FetchContext, FetchOptions, Fetcher, HttpClient, ReleaseClient, ScratchDir,
    Toolchain,
};

/// Fetcher wired to `runner`, with GitHub API calls sent to `api_base`.
pub fn fetcher_with(
    runner: Arc<dyn CommandRunner>,
    api_base: &str,
    options: FetchOptions,
) -> Fetcher {
    let http = HttpClient::new();
    let releases = ReleaseClient::new(http.clone()).with_api_base(api_base);
    Fetcher::new(http, releases, runner, Toolchain::default(), options)
}

/// Context writing into `output` with an ephemeral scratch directory.
pub fn ephemeral_context(output: &Path) -> FetchContext {
    FetchContext::new(output, ScratchDir::ephemeral().unwrap()).unwrap()
}

/// Context writing into `output` with scratch kept in `work`.
pub fn persistent_context(output: &Path, work: &Path) -> FetchContext {
    FetchContext::new(output, ScratchDir::persistent(work).unwrap()).unwrap()
}
