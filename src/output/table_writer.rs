// src/output/table_writer.rs
//! Table Writer
//!
//! Serialises an [`AssembledTable`] as one delimiter-separated file named
//! after its bookkeeping record.

use std::path::{Path, PathBuf};
use tracing::info;

use super::replace_file;
use crate::error::{HouseholdError, Result};
use crate::extraction::assembler::AssembledTable;

/// Writes `table` into `out_dir` and returns the path written. An existing
/// file of the same name is replaced.
pub fn write_table(table: &AssembledTable, out_dir: &Path, delimiter: u8) -> Result<PathBuf> {
    let target = out_dir.join(&table.file_name);
    replace_file(&target, |temp| {
        let csv_err = |source| HouseholdError::Csv {
            path: target.clone(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(temp)
            .map_err(csv_err)?;
        writer.write_record(&table.columns).map_err(csv_err)?;
        for row in &table.rows {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|source| HouseholdError::WriteOutput {
            path: target.clone(),
            source,
        })
    })?;
    info!("TableWriter: Data saved to {}", target.display());
    Ok(target)
}
