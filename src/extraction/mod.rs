// src/extraction/mod.rs
//! Response Extraction Pipeline
//!
//! Recovers structured tables from a run log of model replies.
//!
//! ## Architecture Overview
//!
//! - **Events**: decodes log lines into role-tagged events
//! - **Matcher**: binds each metadata event to the reply it describes
//! - **Sentinel**: pulls the payload out from between the markers
//! - **Repair**: quotes unquoted labels so tuples tokenize
//! - **Groups**: splits the payload into named field groups and renames repeats
//! - **Assembler**: outer-joins the groups into one table per reply
//! - **Pipeline**: drives a stage and collects diagnostics
//!
//! Each step takes the previous step's output by value or reference and
//! returns a plain value, so every step is testable without the others.

pub mod assembler;
pub mod bookkeeping;
pub mod diagnostics;
pub mod events;
pub mod groups;
pub mod literal;
pub mod matcher;
pub mod pipeline;
pub mod repair;
pub mod sentinel;
pub mod stage;

pub use assembler::{AssembledTable, Cell, ColumnNaming};
pub use bookkeeping::{BookkeepingRecord, TokenUsage};
pub use diagnostics::{Diagnostic, DiagnosticKind, StageReport};
pub use events::{parse_events, Event, Role};
pub use pipeline::{extract_stage, run_family_types, run_stage, StageExtraction};
pub use stage::Stage;
