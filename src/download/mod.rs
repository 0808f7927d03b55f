//! HTTP download layer for streaming documents to disk.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large PDFs)
//! - Redirects followed up to a fixed hop limit
//! - Configurable timeouts (30s connect, 5min total by default)
//! - Write-then-rename so failed fetches leave earlier outputs intact
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use specfetch_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let file = client
//!     .download_to_path("https://example.com/gabi.pdf", Path::new("./gabi.pdf"))
//!     .await?;
//! println!("Downloaded: {}", file.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod error;

pub use client::{DownloadedFile, FetchedResource, HttpClient, HttpSettings};
pub(crate) use client::partial_path;
pub use error::DownloadError;
