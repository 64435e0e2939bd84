use anyhow::Result;
use console::style;
use std::path::Path;

use crate::deps::DependencyReport;
use crate::download::{DownloadResult, StoredFile};
use crate::extractors::SpaceInfo;
use crate::utils::{format_duration, format_file_size};

/// Human-readable Space duration
pub fn describe_duration(duration: Option<f64>) -> String {
    match duration {
        Some(secs) => format!("{} seconds ({})", secs, format_duration(secs)),
        None => "Unknown duration".to_string(),
    }
}

/// Print Space metadata to console
pub fn print_space_info(info: &SpaceInfo) {
    println!("Title: {}", info.title);
    println!("Host: {}", info.uploader);
    println!("Duration: {}", describe_duration(info.duration));
}

/// Print per-tool presence and, if anything is missing, install hints
pub fn print_dependency_report(report: &DependencyReport) {
    for status in &report.statuses {
        match &status.location {
            Some(path) => println!(
                "{} {} is installed ({})",
                style("✓").green(),
                status.tool.name(),
                path.display()
            ),
            None => println!(
                "{} {} is not installed or not in PATH",
                style("✗").red(),
                status.tool.name()
            ),
        }
    }

    let missing = report.missing();
    if missing.is_empty() {
        return;
    }

    let names: Vec<_> = missing.iter().map(|tool| tool.name()).collect();
    println!("\nMissing dependencies: {}", names.join(", "));
    println!("\nInstall missing dependencies:");
    for tool in missing {
        for hint in tool.install_hints() {
            println!("  {}", hint);
        }
    }
}

/// List the MP3 files in the output directory
pub fn print_stored_files(dir: &Path, files: &[StoredFile]) {
    println!("\nFiles in {}:", dir.display());
    if files.is_empty() {
        println!("  (none)");
    }
    for file in files {
        println!(
            "  {} ({}, {})",
            file.name,
            format_file_size(file.size),
            file.modified.format("%Y-%m-%d %H:%M")
        );
    }
}

/// Render a result as a single-line JSON object
pub fn format_as_json(result: &DownloadResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Print a result as JSON to stdout
pub fn print_json(result: &DownloadResult) -> Result<()> {
    println!("{}", format_as_json(result)?);
    Ok(())
}
