//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure and do no I/O.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Sitemaps
//! 001 sitemap.xml (50000 entries, 4.1 MB)
//! 002 sitemap-2.xml (1200 entries, 98.3 KB)
//!
//! Index
//!     sitemap_index.xml (2 sitemaps)
//!
//! Wrote 51200 URLs in 2 files
//! ```
//!
//! ## Index
//!
//! ```text
//! Index
//!     sitemap_index.xml (2 sitemaps)
//! ```

use crate::generate::GenerateReport;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size with one decimal place above 1 KB.
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// File name relative to the output directory, falling back to the full path.
fn display_name(path: &Path, output_dir: &Path) -> String {
    path.strip_prefix(output_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Format the index section shared by `build` and `index`.
pub fn format_index_output(index_path: &Path, count: usize, output_dir: &Path) -> Vec<String> {
    vec![
        "Index".to_string(),
        format!(
            "{}{} ({})",
            indent(1),
            display_name(index_path, output_dir),
            plural(count, "sitemap", "sitemaps")
        ),
    ]
}

/// Format the result of a `build` run.
pub fn format_generate_output(report: &GenerateReport, output_dir: &Path) -> Vec<String> {
    let mut lines = vec!["Sitemaps".to_string()];
    for (i, sitemap) in report.sitemaps.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            display_name(&sitemap.path, output_dir),
            plural(sitemap.entries, "entry", "entries"),
            format_bytes(sitemap.bytes)
        ));
    }
    lines.push(String::new());
    lines.extend(format_index_output(
        &report.index_path,
        report.index_entries,
        output_dir,
    ));
    lines.push(String::new());
    lines.push(format!(
        "Wrote {} in {}",
        plural(report.total_entries(), "URL", "URLs"),
        plural(report.sitemaps.len(), "file", "files")
    ));
    lines
}

pub fn print_generate_output(report: &GenerateReport, output_dir: &Path) {
    for line in format_generate_output(report, output_dir) {
        println!("{}", line);
    }
}

pub fn print_index_output(index_path: &Path, count: usize, output_dir: &Path) {
    for line in format_index_output(index_path, count, output_dir) {
        println!("{}", line);
    }
}
