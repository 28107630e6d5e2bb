// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Anything here aborts the running stage; recoverable
/// problems are reported as [`crate::extraction::Diagnostic`] instead.
#[derive(Error, Debug)]
pub enum HouseholdError {
    #[error("Failed to read log file '{path}': {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to append to log file '{path}': {source}")]
    AppendLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Output directory '{path}' could not be created: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write output file '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode CSV for '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to encode JSON for '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = HouseholdError> = std::result::Result<T, E>;
