// src/extraction/bookkeeping.rs
//! Bookkeeping records.
//!
//! Each generation call is followed in the log by a `metadata` event whose
//! content is a flat, comma-separated token list such as
//! `Country, USA, Season, Winter, Usage_Prompt_Tokens, 489, Usage_Completion_Tokens, 185`.
//! Identifier tokens sit at fixed, stage-specific positions. Token usage
//! counters are located by their labels.

use serde::{Deserialize, Serialize};

use super::stage::Stage;

const PROMPT_TOKENS_LABEL: &str = "Usage_Prompt_Tokens";
const COMPLETION_TOKENS_LABEL: &str = "Usage_Completion_Tokens";

/// Token counters reported by the model call. `None` when the log does
/// not carry a readable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: Option<u64>,
    pub completion: Option<u64>,
}

impl TokenUsage {
    /// Reads the counters following their labels in metadata content.
    pub fn from_content(content: &str) -> Self {
        let parts: Vec<&str> = content.split(',').map(str::trim).collect();
        Self::from_parts(&parts)
    }

    fn from_parts(parts: &[&str]) -> Self {
        Self {
            prompt: labelled_count(parts, PROMPT_TOKENS_LABEL),
            completion: labelled_count(parts, COMPLETION_TOKENS_LABEL),
        }
    }

    /// Both counters, when the log carries both.
    pub fn complete(&self) -> Option<(u64, u64)> {
        self.prompt.zip(self.completion)
    }
}

/// The record was shorter than its stage requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientBookkeeping {
    pub found: usize,
    pub required: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookkeepingRecord {
    pub stage: Stage,
    pub country: String,
    pub family_type: Option<String>,
    pub members: Vec<String>,
    pub season: Option<String>,
    pub pattern: Option<String>,
    pub usage: TokenUsage,
}

impl BookkeepingRecord {
    /// Record with only a country, used by the range and roster stages.
    pub fn for_country(stage: Stage, country: impl Into<String>) -> Self {
        Self {
            stage,
            country: country.into(),
            family_type: None,
            members: Vec::new(),
            season: None,
            pattern: None,
            usage: TokenUsage::default(),
        }
    }

    /// Parses a metadata event's content for `stage`.
    pub fn parse(content: &str, stage: Stage) -> Result<Self, InsufficientBookkeeping> {
        let parts: Vec<&str> = content.split(',').map(str::trim).collect();
        let required = stage.required_bookkeeping_tokens();
        if parts.len() < required {
            return Err(InsufficientBookkeeping {
                found: parts.len(),
                required,
            });
        }

        let mut record = Self::for_country(stage, parts[1]);
        record.usage = TokenUsage::from_parts(&parts);

        match stage {
            Stage::Weather => {
                record.season = Some(parts[3].to_string());
            }
            Stage::FamilyConsumption => {
                record.family_type = Some(parts[3].to_string());
                record.members = parts[5]
                    .trim_matches(|c| c == '[' || c == ']')
                    .split('|')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
                record.season = Some(parts[7].to_string());
                record.pattern = Some(parts[9].to_string());
            }
            Stage::WeatherRange | Stage::FamilyTypes => {}
        }
        Ok(record)
    }

    /// Encodes the record back into metadata content, in the token order
    /// [`BookkeepingRecord::parse`] expects.
    pub fn to_metadata_content(&self) -> String {
        let mut out = format!("Country, {}, ", self.country);
        match self.stage {
            Stage::Weather => {
                out.push_str(&format!("Season, {}, ", self.season.as_deref().unwrap_or("")));
            }
            Stage::FamilyConsumption => {
                out.push_str(&format!(
                    "Family Type, {}, Members, [{}], Season, {}, Pattern, {}, ",
                    self.family_type.as_deref().unwrap_or(""),
                    self.members.join("|"),
                    self.season.as_deref().unwrap_or(""),
                    self.pattern.as_deref().unwrap_or(""),
                ));
            }
            Stage::WeatherRange | Stage::FamilyTypes => {}
        }
        out.push_str(&format!(
            "{}, {}, {}, {}",
            PROMPT_TOKENS_LABEL,
            count_text(self.usage.prompt),
            COMPLETION_TOKENS_LABEL,
            count_text(self.usage.completion),
        ));
        out
    }

    /// Value of a bookkeeping column, if this record carries it.
    pub fn column_value(&self, column: &str) -> Option<&str> {
        match column {
            "Country" => Some(&self.country),
            "Family_Type" => self.family_type.as_deref(),
            "Season" => self.season.as_deref(),
            "Pattern" => self.pattern.as_deref(),
            _ => None,
        }
    }

    /// Deterministic output file name. Identical bookkeeping always maps
    /// to the same name, so a re-run overwrites rather than duplicates.
    pub fn output_file_name(&self) -> String {
        let country = file_name_part(&self.country);
        let part = |value: &Option<String>| file_name_part(value.as_deref().unwrap_or(""));
        match self.stage {
            Stage::FamilyConsumption => format!(
                "{}_{}_{}_{}.csv",
                country,
                part(&self.family_type),
                part(&self.season),
                part(&self.pattern)
            ),
            Stage::Weather => format!("{}_{}.csv", country, part(&self.season)),
            Stage::WeatherRange => format!("{}_weather_min_max.csv", country),
            Stage::FamilyTypes => format!("family_types_{}.json", country),
        }
    }
}

/// Spaces become hyphens; path separators are not allowed in a file name.
pub fn file_name_part(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            c => c,
        })
        .collect()
}

fn labelled_count(parts: &[&str], label: &str) -> Option<u64> {
    parts
        .iter()
        .position(|p| *p == label)
        .and_then(|idx| parts.get(idx + 1))
        .and_then(|v| v.parse().ok())
}

fn count_text(count: Option<u64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_default()
}
