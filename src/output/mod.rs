// src/output/mod.rs
//! Table and roster writers.
//!
//! Every file is written to a hidden sibling first and renamed into place,
//! so a failed write never leaves a truncated output behind and a re-run
//! replaces the previous file of the same name.

pub mod json_splitter;
pub mod table_writer;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HouseholdError, Result};

pub use json_splitter::{extract_rosters, write_rosters, RosterExtraction, RosterFile};
pub use table_writer::write_table;

/// Creates `dir` (and parents) if needed.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| HouseholdError::CreateOutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}

/// Runs `write` against a temporary sibling of `target`, then renames it
/// over `target`. The temporary file is removed on failure.
pub(crate) fn replace_file(target: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let temp = temp_sibling(target);
    if let Err(e) = write(&temp) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    fs::rename(&temp, target).map_err(|source| {
        let _ = fs::remove_file(&temp);
        HouseholdError::WriteOutput {
            path: target.to_path_buf(),
            source,
        }
    })
}
