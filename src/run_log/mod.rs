// src/run_log/mod.rs
//! Run log sink and maintenance.
//!
//! The generation side appends one event per line to a working log. Each
//! append opens the file, writes a single line and closes it again, so
//! nothing about the process's own output streams changes.

pub mod usage;

use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{HouseholdError, Result};
use crate::extraction::bookkeeping::BookkeepingRecord;
use crate::extraction::events::{Event, Role};

/// Format of timestamp marker lines, without the brackets.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_T%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` followed by a newline.
    pub fn append_line(&self, line: &str) -> Result<()> {
        let append_err = |source| HouseholdError::AppendLog {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(append_err)?;
        writeln!(file, "{}", line).map_err(append_err)
    }

    pub fn append_event(&self, role: Role, content: &str) -> Result<()> {
        self.append_line(&Event::new(0, role, content).to_log_line())
    }

    /// Appends the metadata event describing the reply logged just before.
    pub fn append_bookkeeping(&self, record: &BookkeepingRecord) -> Result<()> {
        self.append_event(Role::Metadata, &record.to_metadata_content())
    }

    pub fn append_timestamp(&self, at: NaiveDateTime) -> Result<()> {
        self.append_line(&format!("[{}]", at.format(TIMESTAMP_FORMAT)))
    }

    /// Copies the working log to `<stem>.txt`, or to `<stem>_<timestamp>.txt`
    /// when that already exists. With `clear`, the working log is truncated
    /// afterwards. Returns the archive path.
    pub fn archive(&self, stem: &Path, clear: bool, now: NaiveDateTime) -> Result<PathBuf> {
        let mut target = with_suffix(stem, "");
        if target.exists() {
            target = with_suffix(stem, &format!("_{}", now.format(TIMESTAMP_FORMAT)));
        }
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| HouseholdError::CreateOutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&self.path, &target).map_err(|source| HouseholdError::ReadLog {
            path: self.path.clone(),
            source,
        })?;
        info!("RunLog: Copied {} to {}", self.path.display(), target.display());

        if clear {
            fs::write(&self.path, "").map_err(|source| HouseholdError::AppendLog {
                path: self.path.clone(),
                source,
            })?;
            info!("RunLog: Cleared {}", self.path.display());
        }
        Ok(target)
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(suffix);
    name.push(".txt");
    PathBuf::from(name)
}
