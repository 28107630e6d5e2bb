// src/extraction/groups.rs
//! Field-Group Splitter and Name Disambiguator
//!
//! A repaired payload is a run of `#name#[tuples]` groups, one per weather
//! parameter, family member or HVAC channel. Each group body is parsed
//! tuple by tuple: a bad tuple is dropped and reported, its siblings stay.

use std::collections::{HashMap, HashSet};

use super::diagnostics::DiagnosticKind;
use super::literal::{parse_literal, scan_tuples, Literal, Number, TupleSpan};
use super::stage::{RowKey, Stage};

/// Arity of every tuple the pipeline understands.
pub const TUPLE_ARITY: usize = 3;

/// One typed tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTuple {
    /// `(hour, label, value)`
    Hourly { hour: i64, label: String, value: Number },
    /// `(season, min, max)`
    Seasonal { season: String, min: Number, max: Number },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub name: String,
    pub tuples: Vec<FieldTuple>,
}

/// Groups found in one payload plus the tuple-level problems met on the way.
#[derive(Debug, Clone, Default)]
pub struct SplitOutcome {
    pub groups: Vec<FieldGroup>,
    pub issues: Vec<DiagnosticKind>,
}

/// Raw `#name#[body]` spans, in order of appearance.
pub fn find_group_spans(payload: &str) -> Vec<(&str, &str)> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(found) = payload[cursor..].find('#') {
        let open = cursor + found;
        let name_start = open + 1;
        let Some(name_len) = payload[name_start..].find('#') else {
            break;
        };
        let name_end = name_start + name_len;
        let rest = &payload[name_end + 1..];

        let close = match rest.strip_prefix('[') {
            Some(body) if name_len > 0 => body.find(']'),
            _ => None,
        };
        let Some(close) = close else {
            // The closing `#` may open the next group.
            cursor = name_end;
            continue;
        };

        let body_start = name_end + 2;
        let body_end = body_start + close;
        spans.push((payload[name_start..name_end].trim(), &payload[body_start..body_end]));
        cursor = body_end + 1;
    }
    spans
}

/// Splits a repaired payload into typed field groups for `stage`.
pub fn split_groups(payload: &str, stage: Stage) -> SplitOutcome {
    let mut outcome = SplitOutcome::default();

    for (name, body) in find_group_spans(payload) {
        let mut group = FieldGroup {
            name: name.to_string(),
            tuples: Vec::new(),
        };
        for span in scan_tuples(body) {
            match parse_tuple(body, &span, stage) {
                Ok(tuple) => group.tuples.push(tuple),
                Err(reason) => outcome.issues.push(DiagnosticKind::FieldParseError {
                    group: name.to_string(),
                    tuple: span.text(body).to_string(),
                    reason,
                }),
            }
        }
        outcome.groups.push(group);
    }
    outcome
}

fn parse_tuple(body: &str, span: &TupleSpan, stage: Stage) -> Result<FieldTuple, String> {
    if span.fields.len() != TUPLE_ARITY {
        return Err(format!(
            "expected {} fields, found {}",
            TUPLE_ARITY,
            span.fields.len()
        ));
    }
    let values = span
        .fields
        .iter()
        .map(|f| parse_literal(f.text(body)))
        .collect::<Result<Vec<_>, _>>()?;

    match (stage.row_key(), &values[..]) {
        (RowKey::Hour, [Literal::Number(hour), Literal::Str(label), Literal::Number(value)]) => {
            let hour = hour
                .as_integer()
                .ok_or_else(|| format!("hour {} is not a whole number", hour))?;
            Ok(FieldTuple::Hourly {
                hour,
                label: label.clone(),
                value: *value,
            })
        }
        (RowKey::Season, [Literal::Str(season), Literal::Number(min), Literal::Number(max)]) => {
            Ok(FieldTuple::Seasonal {
                season: season.trim().to_string(),
                min: *min,
                max: *max,
            })
        }
        (RowKey::Hour, _) => Err("expected (hour, label, value)".to_string()),
        (RowKey::Season, _) => Err("expected (season, min, max)".to_string()),
    }
}

/// Renames repeated group names in place: the first occurrence keeps its
/// name, later ones get the first free `_01`, `_02`, ... suffix. A suffixed
/// name is never one that any group of the payload already uses.
pub fn disambiguate(groups: &mut [FieldGroup]) {
    let original: HashSet<String> = groups.iter().map(|g| g.name.clone()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();

    for group in groups.iter_mut() {
        if taken.insert(group.name.clone()) {
            continue;
        }
        let counter = counters.entry(group.name.clone()).or_insert(0);
        let renamed = loop {
            *counter += 1;
            let candidate = format!("{}_{:02}", group.name, counter);
            if !original.contains(&candidate) && !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(renamed.clone());
        group.name = renamed;
    }
}
