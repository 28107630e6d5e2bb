// src/settings/mod.rs
pub mod io;

use serde::{Deserialize, Serialize};

use crate::error::{HouseholdError, Result};
use crate::extraction::assembler::ColumnNaming;
use crate::extraction::sentinel::SentinelMarkers;

/// Settings shared by every stage run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub start_marker: String,
    pub end_marker: String,
    /// Remove `'s` / `-s` artefacts from generated column names.
    pub strip_possessives: bool,
    pub csv_delimiter: char,
    /// File name template for roster files; `country_placeholder` is replaced
    /// by the hyphenated country name.
    pub family_types_template: String,
    pub country_placeholder: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let markers = SentinelMarkers::default();
        Self {
            start_marker: markers.start,
            end_marker: markers.end,
            strip_possessives: true,
            csv_delimiter: ',',
            family_types_template: "family_types_$COUNTRY$.json".to_string(),
            country_placeholder: "$COUNTRY$".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn markers(&self) -> SentinelMarkers {
        SentinelMarkers::new(self.start_marker.clone(), self.end_marker.clone())
    }

    pub fn column_naming(&self) -> ColumnNaming {
        ColumnNaming {
            strip_possessives: self.strip_possessives,
        }
    }

    /// The delimiter as the single byte the CSV writer needs.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.csv_delimiter)
            .ok()
            .filter(|b| b.is_ascii() && *b != b'"' && *b != b'\n')
            .ok_or_else(|| {
                HouseholdError::Settings(format!(
                    "csv_delimiter {:?} must be a single ASCII character",
                    self.csv_delimiter
                ))
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_marker.trim_matches('$').is_empty() || self.end_marker.trim_matches('$').is_empty() {
            return Err(HouseholdError::Settings(
                "start_marker and end_marker must not be empty".to_string(),
            ));
        }
        if self.country_placeholder.is_empty() {
            return Err(HouseholdError::Settings(
                "country_placeholder must not be empty".to_string(),
            ));
        }
        self.delimiter_byte().map(|_| ())
    }
}
