// src/cli/usage.rs
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{HouseholdError, Result};
use crate::run_log::usage::{summarize_log, UsageSummary};

/// `path` itself when it is a file, otherwise every `.txt` below it.
fn log_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    files
}

fn print_summary(label: &str, summary: &UsageSummary) {
    println!(
        "{:<40} {:>6} {:>12} {:>12} {:>10} {:>10}",
        label,
        summary.calls,
        summary.prompt_tokens,
        summary.completion_tokens,
        summary
            .total_seconds
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        summary
            .mean_seconds
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string()),
    );
}

pub fn run(path: &Path) -> Result<()> {
    let files = log_files(path);
    if files.is_empty() {
        println!("No log files found in {}", path.display());
        return Ok(());
    }

    println!(
        "{:<40} {:>6} {:>12} {:>12} {:>10} {:>10}",
        "Log", "Calls", "Prompt", "Completion", "Total (s)", "Mean (s)"
    );
    println!("{}", "-".repeat(95));

    let mut total = UsageSummary::default();
    for file in &files {
        let content = fs::read_to_string(file).map_err(|source| HouseholdError::ReadLog {
            path: file.clone(),
            source,
        })?;
        let summary = summarize_log(&content);
        let label = file
            .strip_prefix(path)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(file.as_path())
            .display()
            .to_string();
        print_summary(&label, &summary);
        total.merge(&summary);
    }

    if files.len() > 1 {
        println!("{}", "-".repeat(95));
        print_summary("Total", &total);
    }
    Ok(())
}
