//! CLI output formatting: manifest listing and the end-of-run summary.

use std::path::Path;

use specfetch_core::{EntryStatus, Manifest, RunReport};

const DEFAULT_WIDTH: usize = 80;
const MIN_WIDTH: usize = 20;

/// Line width for listings: `COLUMNS` when it is a sane number, else 80.
fn line_width() -> usize {
    match std::env::var("COLUMNS").map(|v| v.parse::<usize>()) {
        Ok(Ok(width)) if width >= MIN_WIDTH => width,
        _ => DEFAULT_WIDTH,
    }
}

/// Cuts `line` to `width` characters, marking the cut with an ellipsis.
fn fit_line(line: &str, width: usize) -> String {
    match line.char_indices().nth(width) {
        None => line.to_string(),
        Some(_) if width == 0 => String::new(),
        Some(_) => {
            let mut fitted: String = line.chars().take(width - 1).collect();
            fitted.push('…');
            fitted
        }
    }
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.map(|l| l.chars().count()).max().unwrap_or(0)
}

/// One line per manifest entry: label, kind, destination, source.
pub fn render_manifest_lines(manifest: &Manifest, width: usize) -> Vec<String> {
    let pad = label_width(manifest.labels());
    manifest
        .entries()
        .iter()
        .map(|entry| {
            let line = format!(
                "{:<pad$}  {:<14}  {:<16}  {}",
                entry.label,
                entry.source.kind(),
                entry.destination.display().to_string(),
                entry.source,
            );
            fit_line(&line, width)
        })
        .collect()
}

/// Prints the manifest to stdout.
pub fn print_manifest(manifest: &Manifest) {
    for line in render_manifest_lines(manifest, line_width()) {
        println!("{line}");
    }
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Summary table: one line per entry, indented warnings, then the totals.
pub fn render_summary_lines(report: &RunReport, output_dir: &Path, width: usize) -> Vec<String> {
    let pad = label_width(report.outcomes().iter().map(|o| o.label.as_str()));
    let mut lines = Vec::with_capacity(report.outcomes().len() + 2);

    for outcome in report.outcomes() {
        let (marker, detail) = match &outcome.status {
            EntryStatus::Succeeded { artifacts } => (
                "ok  ",
                artifacts
                    .iter()
                    .map(|p| display_relative(p, output_dir))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            EntryStatus::Failed { error } => ("FAIL", error.clone()),
            EntryStatus::Skipped { reason } => ("skip", reason.clone()),
        };
        let line = format!(
            "{marker}  {:<pad$}  {detail} ({:.1}s)",
            outcome.label,
            outcome.elapsed.as_secs_f64()
        );
        lines.push(fit_line(&line, width));
        for warning in &outcome.warnings {
            lines.push(fit_line(&format!("      warning: {warning}"), width));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} succeeded, {} failed, {} skipped, {} warnings; output in {}",
        report.succeeded(),
        report.failed(),
        report.skipped(),
        report.warnings(),
        output_dir.display()
    ));
    lines
}

/// Prints the run summary to stdout.
pub fn print_summary(report: &RunReport, output_dir: &Path) {
    for line in render_summary_lines(report, output_dir, line_width()) {
        println!("{line}");
    }
}
