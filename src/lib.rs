// src/lib.rs
//! Recovery of structured household and weather tables from the run logs
//! of a staged text-generation job.

pub mod cli;
pub mod error;
pub mod extraction;
pub mod output;
pub mod run_log;
pub mod settings;

pub use error::{HouseholdError, Result};
