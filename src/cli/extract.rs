// src/cli/extract.rs
use std::fs;
use std::path::Path;

use crate::error::{HouseholdError, Result};
use crate::extraction::{run_stage, Stage, StageReport};

pub fn run(
    config: Option<&Path>,
    stage: Stage,
    log: &Path,
    out: &Path,
    expect: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    let settings = super::load_settings(config)?;
    println!("=== Extracting {} from {} ===\n", stage, log.display());

    let report = run_stage(log, out, stage, &settings, expect)?;
    print_report(&report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).map_err(|source| HouseholdError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| HouseholdError::WriteOutput {
            path: path.to_path_buf(),
            source,
        })?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn print_report(report: &StageReport) {
    for path in &report.written {
        println!("  wrote {}", path.display());
    }
    if !report.diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for diagnostic in &report.diagnostics {
            println!("  {}", diagnostic);
        }
    }
    println!("\n{}", report.summary());
}
