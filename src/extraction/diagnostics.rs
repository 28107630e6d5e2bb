// src/extraction/diagnostics.rs
//! Diagnostics and per-stage reports.
//!
//! Nothing recoverable unwinds a run. Each problem is recorded against the
//! log line it concerns and logged as it happens, so the caller can tell
//! how much was attempted, how much came out, and why the rest did not.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::stage::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The stage has no tuple payload to assemble into a table.
    NotTabular,
    /// The log holds no event the stage can work with.
    NoEvents { assistant: usize, metadata: usize },
    /// A metadata event had no unconsumed reply before it.
    PairingMiss,
    /// A reply was never bound to any metadata event.
    OrphanedReply,
    /// A metadata event carried fewer tokens than its stage needs.
    InsufficientBookkeeping { found: usize, required: usize },
    /// No start/end marker span in the reply.
    StructuralMiss,
    /// A span was found but holds no `#name#[...]` group.
    NoFieldGroups,
    /// One tuple could not be parsed; its siblings are kept.
    FieldParseError {
        group: String,
        tuple: String,
        reason: String,
    },
    /// The row key of a tuple is outside the stage's key domain.
    InvalidKey { group: String, key: String },
    /// A group repeated a row key; the first value was kept.
    DuplicateKey { group: String, key: String },
    /// A group's columns collide with an earlier group; it was dropped.
    DuplicateGroup { group: String },
    /// A group held no parsable tuple.
    EmptyGroup { group: String },
    /// No group of the pair produced a single usable value.
    NoUsableRows,
    /// The roster payload is not valid JSON.
    InvalidJson { reason: String },
    /// The caller expected a different number of pairs.
    PairCountMismatch { expected: usize, matched: usize },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::NoEvents { assistant, metadata } => write!(
                f,
                "no usable events ({} assistant, {} metadata)",
                assistant, metadata
            ),
            DiagnosticKind::NotTabular => write!(f, "stage does not produce tables"),
            DiagnosticKind::PairingMiss => write!(f, "no assistant reply found for metadata"),
            DiagnosticKind::OrphanedReply => write!(f, "assistant reply was never paired"),
            DiagnosticKind::InsufficientBookkeeping { found, required } => write!(
                f,
                "insufficient metadata parts ({} found, {} required)",
                found, required
            ),
            DiagnosticKind::StructuralMiss => write!(f, "no valid message sequence found"),
            DiagnosticKind::NoFieldGroups => write!(f, "no valid parameter data found in the message"),
            DiagnosticKind::FieldParseError { group, tuple, reason } => {
                write!(f, "group '{}': dropped tuple {} ({})", group, tuple, reason)
            }
            DiagnosticKind::InvalidKey { group, key } => {
                write!(f, "group '{}': invalid row key '{}'", group, key)
            }
            DiagnosticKind::DuplicateKey { group, key } => {
                write!(f, "group '{}': repeated row key '{}', kept the first", group, key)
            }
            DiagnosticKind::DuplicateGroup { group } => {
                write!(f, "group '{}' collides with an earlier column, dropped", group)
            }
            DiagnosticKind::EmptyGroup { group } => write!(f, "group '{}' has no usable tuples", group),
            DiagnosticKind::NoUsableRows => write!(f, "no valid data parsed for this reply"),
            DiagnosticKind::InvalidJson { reason } => write!(f, "failed to parse JSON: {}", reason),
            DiagnosticKind::PairCountMismatch { expected, matched } => {
                write!(f, "expected {} pairs, matched {}", expected, matched)
            }
        }
    }
}

/// A diagnostic tied to the log line it concerns, when there is one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub line: Option<usize>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Orphaned replies are expected in multi-turn stages, where the previous
    /// reply is logged again as context.
    pub fn is_routine(&self) -> bool {
        matches!(self.kind, DiagnosticKind::OrphanedReply)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line + 1, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Outcome of one stage run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Extractions attempted: metadata events, or replies for the roster stage.
    pub attempted: usize,
    /// Extractions that produced an output.
    pub succeeded: usize,
    pub written: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            attempted: 0,
            succeeded: 0,
            written: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Records and logs a diagnostic.
    pub fn record(&mut self, line: Option<usize>, kind: DiagnosticKind) {
        let diagnostic = Diagnostic { line, kind };
        if diagnostic.is_routine() {
            debug!("Pipeline [{}]: {}", self.stage, diagnostic);
        } else {
            warn!("Pipeline [{}]: {}", self.stage, diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, line: Option<usize>, kinds: impl IntoIterator<Item = DiagnosticKind>) {
        for kind in kinds {
            self.record(line, kind);
        }
    }

    pub fn count_where(&self, predicate: impl Fn(&DiagnosticKind) -> bool) -> usize {
        self.diagnostics.iter().filter(|d| predicate(&d.kind)).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.succeeded)
    }

    pub fn summary(&self) -> String {
        let routine = self.diagnostics.iter().filter(|d| d.is_routine()).count();
        format!(
            "{}: {} attempted, {} succeeded, {} failed, {} files written, {} diagnostics ({} routine)",
            self.stage,
            self.attempted,
            self.succeeded,
            self.failed(),
            self.written.len(),
            self.diagnostics.len(),
            routine
        )
    }
}
