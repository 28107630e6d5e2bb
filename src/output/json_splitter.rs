// src/output/json_splitter.rs
//! JSON Record Splitter
//!
//! The roster stage asks for valid JSON instead of tuples, one reply per
//! country. Each reply's payload is parsed as-is and written to its own
//! file, named from a template with the country substituted. No metadata
//! pairing is involved.

use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::replace_file;
use crate::error::{HouseholdError, Result};
use crate::extraction::bookkeeping::file_name_part;
use crate::extraction::diagnostics::{DiagnosticKind, StageReport};
use crate::extraction::events::{parse_events, Role};
use crate::extraction::sentinel::extract_raw;
use crate::extraction::stage::Stage;
use crate::settings::PipelineSettings;

const UNKNOWN_COUNTRY: &str = "Unknown";
const CODE_FENCE: &str = "```";

/// One roster document ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterFile {
    /// Line of the reply it came from.
    pub line: usize,
    pub country: String,
    pub file_name: String,
    pub document: Value,
}

#[derive(Debug, Clone)]
pub struct RosterExtraction {
    pub files: Vec<RosterFile>,
    pub report: StageReport,
}

/// Country of a roster: `Country` of the first array element, or of the
/// object itself.
fn roster_country(document: &Value) -> String {
    let holder = match document {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(document),
        _ => None,
    };
    holder
        .and_then(|h| h.get("Country"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string()
}

/// Extracts every roster in `log`, one per assistant reply. Pure: nothing
/// is written.
pub fn extract_rosters(log: &str, settings: &PipelineSettings, template: &str) -> RosterExtraction {
    let markers = settings.markers();
    let mut report = StageReport::new(Stage::FamilyTypes);
    let events = parse_events(log);
    let replies: Vec<_> = events.iter().filter(|e| e.role == Role::Assistant).collect();
    let mut files = Vec::new();

    if replies.is_empty() {
        report.record(
            None,
            DiagnosticKind::NoEvents {
                assistant: 0,
                metadata: events.len(),
            },
        );
        return RosterExtraction { files, report };
    }
    info!("JsonSplitter: Extracted {} assistant lines.", replies.len());

    for reply in replies {
        report.attempted += 1;
        let content = reply.content.trim().replace(CODE_FENCE, "");
        let Some(raw) = extract_raw(&content, &markers) else {
            report.record(Some(reply.line_index), DiagnosticKind::StructuralMiss);
            continue;
        };
        let document: Value = match serde_json::from_str(raw) {
            Ok(doc) => doc,
            Err(e) => {
                report.record(
                    Some(reply.line_index),
                    DiagnosticKind::InvalidJson {
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };
        let country = roster_country(&document);
        let file_name = template.replace(&settings.country_placeholder, &file_name_part(&country));
        debug!("JsonSplitter: line {} -> {}", reply.line_index + 1, file_name);
        files.push(RosterFile {
            line: reply.line_index,
            country,
            file_name,
            document,
        });
        report.succeeded += 1;
    }
    RosterExtraction { files, report }
}

/// Writes each roster as pretty-printed JSON into `out_dir`. Returns each
/// path once, in first-written order; a later roster of the same name
/// replaces the earlier file.
pub fn write_rosters(files: &[RosterFile], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    let mut seen = HashSet::new();
    for roster in files {
        let target = out_dir.join(&roster.file_name);
        replace_file(&target, |temp| {
            let file = fs::File::create(temp).map_err(|source| HouseholdError::WriteOutput {
                path: target.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &roster.document).map_err(|source| {
                HouseholdError::Json {
                    path: target.clone(),
                    source,
                }
            })?;
            writer.flush().map_err(|source| HouseholdError::WriteOutput {
                path: target.clone(),
                source,
            })
        })?;
        info!("JsonSplitter: Data saved to {}", target.display());
        if seen.insert(target.clone()) {
            written.push(target);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::events::Event;

    const TEMPLATE: &str = "family_types_$COUNTRY$.json";

    fn reply_line(content: &str) -> String {
        Event::new(0, Role::Assistant, content).to_log_line()
    }

    #[test]
    fn test_extracts_roster_per_reply() {
        let log = [
            "{'role': 'user', 'content': 'List family types for New Zealand'}".to_string(),
            reply_line(
                "Sure:\n```json\n$$MESSAGE_START$$[{\"Country\": \"New Zealand\", \"Family_Type\": \"Couple\"}]$$MESSAGE_END$$\n```",
            ),
            reply_line("$$MESSAGE_START$$[{\"Country\": \"USA\"}]$$MESSAGE_END$$"),
        ]
        .join("\n");
        let extraction = extract_rosters(&log, &PipelineSettings::default(), TEMPLATE);
        let names: Vec<&str> = extraction.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["family_types_New-Zealand.json", "family_types_USA.json"]);
        assert_eq!(extraction.files[0].line, 1);
        assert_eq!(extraction.report.attempted, 2);
        assert_eq!(extraction.report.succeeded, 2);
    }

    #[test]
    fn test_country_defaults_to_unknown() {
        assert_eq!(roster_country(&serde_json::json!([{"Family_Type": "Single"}])), "Unknown");
        assert_eq!(roster_country(&serde_json::json!({"Country": "Chile"})), "Chile");
        assert_eq!(roster_country(&serde_json::json!([])), "Unknown");
    }

    #[test]
    fn test_invalid_json_and_missing_markers_are_reported() {
        let log = [
            reply_line("$$MESSAGE_START$$[{'Country': 'USA'}]$$MESSAGE_END$$"),
            reply_line("no markers here"),
        ]
        .join("\n");
        let extraction = extract_rosters(&log, &PipelineSettings::default(), TEMPLATE);
        assert!(extraction.files.is_empty());
        assert_eq!(extraction.report.failed(), 2);
        assert_eq!(
            extraction
                .report
                .count_where(|k| matches!(k, DiagnosticKind::InvalidJson { .. })),
            1
        );
        assert_eq!(
            extraction
                .report
                .count_where(|k| matches!(k, DiagnosticKind::StructuralMiss)),
            1
        );
    }

    #[test]
    fn test_write_rosters_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![RosterFile {
            line: 0,
            country: "USA".into(),
            file_name: "family_types_USA.json".into(),
            document: serde_json::json!([{"Country": "USA"}]),
        }];
        let written = write_rosters(&files, dir.path()).unwrap();
        let text = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(text, "[\n  {\n    \"Country\": \"USA\"\n  }\n]");
    }

    #[test]
    fn test_repeated_country_is_listed_once() {
        let dir = tempfile::tempdir().unwrap();
        let roster = |country: &str| RosterFile {
            line: 0,
            country: country.into(),
            file_name: format!("family_types_{}.json", country),
            document: serde_json::json!([{ "Country": country }]),
        };
        let files = vec![roster("USA"), roster("Chile"), roster("USA")];
        let written = write_rosters(&files, dir.path()).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("family_types_USA.json"),
                dir.path().join("family_types_Chile.json")
            ]
        );
    }
}
