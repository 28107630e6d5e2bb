// src/extraction/pipeline.rs
//! Stage Driver
//!
//! ## Responsibilities
//!
//! - Decode the run log and pair metadata events with replies
//! - Push every pair through extraction, repair, splitting and assembly
//! - Collect diagnostics into one [`StageReport`]
//! - Write the resulting tables (the only step that touches the disk)
//!
//! [`extract_stage`] is pure; [`run_stage`] adds reading and writing on top.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::assembler::{assemble, AssembledTable};
use super::bookkeeping::BookkeepingRecord;
use super::diagnostics::{DiagnosticKind, StageReport};
use super::events::parse_events;
use super::groups::{disambiguate, split_groups};
use super::matcher::{match_pairs, MatchedPair};
use super::repair::repair;
use super::sentinel::extract_payload;
use super::stage::Stage;
use crate::error::{HouseholdError, Result};
use crate::output::{ensure_output_dir, extract_rosters, write_rosters, write_table};
use crate::settings::PipelineSettings;

/// Tables extracted from one log, in metadata order, plus the report.
#[derive(Debug, Clone)]
pub struct StageExtraction {
    pub tables: Vec<AssembledTable>,
    pub report: StageReport,
}

/// Runs every paired step for `stage` over the log text. Nothing is read
/// or written here. The roster stage yields no tables; see
/// [`crate::output::extract_rosters`].
pub fn extract_stage(
    log: &str,
    stage: Stage,
    settings: &PipelineSettings,
    expected_pairs: Option<usize>,
) -> StageExtraction {
    let mut report = StageReport::new(stage);
    let mut tables = Vec::new();

    if !stage.is_tabular() {
        report.record(None, DiagnosticKind::NotTabular);
        return StageExtraction { tables, report };
    }

    let events = parse_events(log);
    let pairing = match_pairs(&events);
    report.attempted = pairing.metadata_count;

    if pairing.assistant_count == 0 || pairing.metadata_count == 0 {
        // Still falls through: each metadata event gets its miss and each
        // reply its orphan diagnostic.
        report.record(
            None,
            DiagnosticKind::NoEvents {
                assistant: pairing.assistant_count,
                metadata: pairing.metadata_count,
            },
        );
    } else {
        info!(
            "Pipeline [{}]: {} assistant and {} metadata events, {} pairs",
            stage,
            pairing.assistant_count,
            pairing.metadata_count,
            pairing.pairs.len()
        );
    }

    if let Some(expected) = expected_pairs {
        if expected != pairing.pairs.len() {
            report.record(
                None,
                DiagnosticKind::PairCountMismatch {
                    expected,
                    matched: pairing.pairs.len(),
                },
            );
        }
    }

    for metadata in &pairing.unmatched_metadata {
        report.record(Some(metadata.line_index), DiagnosticKind::PairingMiss);
    }

    for pair in &pairing.pairs {
        if let Some(table) = extract_pair(pair, stage, settings, &mut report) {
            report.succeeded += 1;
            tables.push(table);
        }
    }

    for reply in &pairing.orphaned_replies {
        report.record(Some(reply.line_index), DiagnosticKind::OrphanedReply);
    }

    StageExtraction { tables, report }
}

fn extract_pair(
    pair: &MatchedPair<'_>,
    stage: Stage,
    settings: &PipelineSettings,
    report: &mut StageReport,
) -> Option<AssembledTable> {
    let line = Some(pair.metadata.line_index);

    let record = match BookkeepingRecord::parse(&pair.metadata.content, stage) {
        Ok(record) => record,
        Err(short) => {
            report.record(
                line,
                DiagnosticKind::InsufficientBookkeeping {
                    found: short.found,
                    required: short.required,
                },
            );
            return None;
        }
    };

    let reply_line = Some(pair.assistant.line_index);
    let Some(payload) = extract_payload(&pair.assistant.content, &settings.markers()) else {
        report.record(reply_line, DiagnosticKind::StructuralMiss);
        return None;
    };

    let repaired = repair(&payload, stage);
    let mut split = split_groups(&repaired, stage);
    report.extend(reply_line, split.issues.drain(..));
    if split.groups.is_empty() {
        report.record(reply_line, DiagnosticKind::NoFieldGroups);
        return None;
    }

    if stage.disambiguates_names() {
        disambiguate(&mut split.groups);
    }

    let outcome = assemble(&split.groups, &record, &settings.column_naming());
    report.extend(reply_line, outcome.issues);
    if let Some(table) = &outcome.table {
        debug!(
            "Pipeline [{}]: line {} -> {} ({} columns, {} rows)",
            stage,
            pair.metadata.line_index + 1,
            table.file_name,
            table.columns.len(),
            table.rows.len()
        );
    }
    outcome.table
}

fn read_log(log_path: &Path) -> Result<String> {
    fs::read_to_string(log_path).map_err(|source| HouseholdError::ReadLog {
        path: log_path.to_path_buf(),
        source,
    })
}

/// Reads `log_path`, extracts `stage` and writes one file per table into
/// `out_dir`. The roster stage is routed to [`run_family_types`].
pub fn run_stage(
    log_path: &Path,
    out_dir: &Path,
    stage: Stage,
    settings: &PipelineSettings,
    expected_pairs: Option<usize>,
) -> Result<StageReport> {
    if stage == Stage::FamilyTypes {
        return run_family_types(log_path, out_dir, settings, &settings.family_types_template);
    }
    let delimiter = settings.delimiter_byte()?;
    let log = read_log(log_path)?;
    info!("Pipeline [{}]: Processing {}", stage, log_path.display());

    let StageExtraction { tables, mut report } = extract_stage(&log, stage, settings, expected_pairs);
    if !tables.is_empty() {
        ensure_output_dir(out_dir)?;
    }
    let mut seen = HashSet::new();
    for table in &tables {
        let path = write_table(table, out_dir, delimiter)?;
        if seen.insert(path.clone()) {
            report.written.push(path);
        }
    }
    info!("Pipeline: {}", report.summary());
    Ok(report)
}

/// Reads `log_path` and writes one roster file per reply into `out_dir`,
/// named from `template`.
pub fn run_family_types(
    log_path: &Path,
    out_dir: &Path,
    settings: &PipelineSettings,
    template: &str,
) -> Result<StageReport> {
    let log = read_log(log_path)?;
    info!("Pipeline [{}]: Processing {}", Stage::FamilyTypes, log_path.display());

    let extraction = extract_rosters(&log, settings, template);
    let mut report = extraction.report;
    if !extraction.files.is_empty() {
        ensure_output_dir(out_dir)?;
    }
    report.written = write_rosters(&extraction.files, out_dir)?;
    info!("Pipeline: {}", report.summary());
    Ok(report)
}
