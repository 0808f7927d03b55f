//! HTML-to-PDF conversion and PDF concatenation.
//!
//! Each mirrored page is rendered to its own PDF named after its sequence
//! number, then the PDFs are joined in sequence order into one document.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::mirror::MirroredPage;
use crate::tools::{CommandRunner, ToolCommand, ToolError};

/// Errors that prevent producing the combined document.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No page converted successfully.
    #[error("none of the {pages} mirrored pages converted to PDF")]
    NothingConverted {
        /// Number of pages attempted.
        pages: usize,
    },

    /// The concatenation tool failed.
    #[error("failed to concatenate PDFs: {0}")]
    Concatenate(#[source] ToolError),

    /// Preparing the output location failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// A page rendered to PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    /// Sequence number of the source page.
    pub sequence: usize,
    /// The rendered PDF.
    pub pdf: PathBuf,
}

/// Outcome of converting a set of pages.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Rendered pages in sequence order.
    pub converted: Vec<ConvertedPage>,
    /// Pages that failed to render, with the error.
    pub failed: Vec<(MirroredPage, ToolError)>,
}

/// Runs the converter and concatenator tools.
#[derive(Debug, Clone, Copy)]
pub struct PdfPipeline<'a> {
    runner: &'a dyn CommandRunner,
    html_to_pdf: &'a str,
    pdf_concat: &'a str,
}

impl<'a> PdfPipeline<'a> {
    /// Creates a pipeline using the given program names.
    pub fn new(runner: &'a dyn CommandRunner, html_to_pdf: &'a str, pdf_concat: &'a str) -> Self {
        Self {
            runner,
            html_to_pdf,
            pdf_concat,
        }
    }

    /// Renders every page into `out_dir`, one PDF per page.
    ///
    /// Failures are recorded in the report and do not stop later pages.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Io`] if `out_dir` cannot be created.
    #[instrument(skip(self, pages), fields(pages = pages.len(), out = %out_dir.display()))]
    pub async fn convert_pages(
        &self,
        pages: &[MirroredPage],
        out_dir: &Path,
    ) -> Result<ConversionReport, ConvertError> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|source| ConvertError::Io {
                path: out_dir.to_path_buf(),
                source,
            })?;

        let mut ordered: Vec<&MirroredPage> = pages.iter().collect();
        ordered.sort_by_key(|p| p.sequence);

        let mut report = ConversionReport::default();
        for page in ordered {
            let pdf = out_dir.join(page_pdf_name(page));
            let cmd = ToolCommand::new(self.html_to_pdf)
                .arg(&page.path)
                .arg(&pdf);
            match self.runner.run(&cmd).await {
                Ok(_) => {
                    debug!(sequence = page.sequence, pdf = %pdf.display(), "converted page");
                    report.converted.push(ConvertedPage {
                        sequence: page.sequence,
                        pdf,
                    });
                }
                Err(e) => {
                    warn!(url = %page.url, error = %e, "page failed to convert, omitting it");
                    report.failed.push((page.clone(), e));
                }
            }
        }

        info!(
            converted = report.converted.len(),
            failed = report.failed.len(),
            "page conversion finished"
        );
        Ok(report)
    }

    /// Joins `pages` in sequence order into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::NothingConverted`] for an empty input and
    /// [`ConvertError::Concatenate`] if the tool fails.
    #[instrument(skip(self, pages), fields(pages = pages.len(), output = %output.display()))]
    pub async fn concatenate(
        &self,
        pages: &[ConvertedPage],
        output: &Path,
    ) -> Result<(), ConvertError> {
        if pages.is_empty() {
            return Err(ConvertError::NothingConverted { pages: 0 });
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConvertError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut ordered: Vec<&ConvertedPage> = pages.iter().collect();
        ordered.sort_by_key(|p| p.sequence);

        let cmd = ToolCommand::new(self.pdf_concat)
            .args(ordered.iter().map(|p| p.pdf.as_os_str()))
            .arg(output);
        self.runner
            .run(&cmd)
            .await
            .map_err(ConvertError::Concatenate)?;
        info!("combined document written");
        Ok(())
    }
}

/// `NNNN-<stem>.pdf`, so lexical order equals sequence order.
#[must_use]
pub fn page_pdf_name(page: &MirroredPage) -> String {
    let stem = page
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    format!("{:04}-{stem}.pdf", page.sequence)
}
