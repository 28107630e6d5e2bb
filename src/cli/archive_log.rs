// src/cli/archive_log.rs
use chrono::Local;
use std::path::Path;

use crate::error::Result;
use crate::run_log::RunLog;

pub fn run(from: &Path, to: &Path, clear: bool) -> Result<()> {
    let log = RunLog::new(from);
    let target = log.archive(to, clear, Local::now().naive_local())?;
    println!("Copied {} to {}", from.display(), target.display());
    if clear {
        println!("Cleared {}", from.display());
    }
    Ok(())
}
