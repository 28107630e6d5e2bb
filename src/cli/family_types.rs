// src/cli/family_types.rs
use std::path::Path;

use crate::error::Result;
use crate::extraction::run_family_types;

pub fn run(config: Option<&Path>, log: &Path, out: &Path, template: Option<&str>) -> Result<()> {
    let settings = super::load_settings(config)?;
    let template = template.unwrap_or(settings.family_types_template.as_str());
    println!("=== Splitting family rosters from {} ===\n", log.display());

    let report = run_family_types(log, out, &settings, template)?;
    super::extract::print_report(&report);
    Ok(())
}
