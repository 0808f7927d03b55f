//! Specfetch Core Library
//!
//! Retrieves a fixed set of ABI and ELF specification documents into one
//! output directory. Each manifest entry is fetched by one of four methods:
//! a plain HTTP download, GitHub release assets matched by glob, an HTML page
//! tree rendered to a single PDF, or a Git repository built locally.
//!
//! # Architecture
//!
//! - [`manifest`] - The compiled-in list of documents and its validation
//! - [`context`] - Output and scratch directories passed to every operation
//! - [`download`] - HTTP client with streaming, atomic file replacement
//! - [`github`] - Latest-release lookup and asset download
//! - [`mirror`] - Bounded recursive retrieval of HTML pages
//! - [`convert`] - HTML-to-PDF conversion and PDF concatenation
//! - [`vcs`] - Clone-or-pull of Git checkouts
//! - [`tools`] - External program execution behind a trait
//! - [`fetcher`] - Runs a manifest and aggregates per-entry outcomes

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod convert;
pub mod download;
pub mod fetcher;
pub mod github;
pub mod manifest;
pub mod mirror;
pub mod tools;
mod user_agent;
pub mod vcs;

// Re-export commonly used types
pub use context::{ContextError, FetchContext, ScratchDir, default_output_dir};
pub use download::{DownloadError, HttpClient, HttpSettings};
pub use fetcher::{
    EntryOutcome, EntryStatus, ExitOutcome, FetchError, FetchOptions, Fetcher, MAX_CONCURRENCY,
    MIN_CONCURRENCY, RunObserver, RunReport,
};
pub use github::{DEFAULT_API_BASE, ReleaseClient};
pub use manifest::{BuildRecipe, Manifest, ManifestEntry, ManifestError, Source};
pub use mirror::DEFAULT_MAX_PAGES;
pub use tools::{CommandRunner, SystemRunner, ToolCommand, ToolError, ToolOutput, Toolchain};
