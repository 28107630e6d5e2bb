// src/extraction/stage.rs
//! Generation stages and their fixed schemas.
//!
//! Every stage that goes through the paired pipeline has a fixed shape:
//! how many bookkeeping tokens it needs, which column is the row key,
//! which bookkeeping columns lead the table and how the two value columns
//! of each field group are suffixed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::repair::RepairRule;

/// The four dependent generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Family roster per country (JSON payload, no pairing).
    FamilyTypes,
    /// Seasonal min/max ranges per weather parameter.
    WeatherRange,
    /// Hourly weather per country and season.
    Weather,
    /// Hourly household consumption per family, season and day pattern.
    FamilyConsumption,
}

/// Which column keys the rows of an assembled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    /// `Hour`, 0 through 23.
    Hour,
    /// `Season`, free text, ordered by first appearance.
    Season,
}

pub const HOURS_PER_DAY: u8 = 24;

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FamilyTypes => "family_types",
            Stage::WeatherRange => "weather_range",
            Stage::Weather => "weather",
            Stage::FamilyConsumption => "family_consumption",
        }
    }

    /// Whether replies go through the tuple pipeline. The roster stage
    /// carries JSON instead.
    pub fn is_tabular(&self) -> bool {
        !matches!(self, Stage::FamilyTypes)
    }

    /// Minimum number of comma-separated bookkeeping tokens.
    pub fn required_bookkeeping_tokens(&self) -> usize {
        match self {
            Stage::FamilyTypes | Stage::WeatherRange => 2,
            Stage::Weather => 4,
            Stage::FamilyConsumption => 10,
        }
    }

    pub fn row_key(&self) -> RowKey {
        match self {
            Stage::WeatherRange | Stage::FamilyTypes => RowKey::Season,
            Stage::Weather | Stage::FamilyConsumption => RowKey::Hour,
        }
    }

    /// Suffixes of the two value columns built for each field group.
    pub fn value_suffixes(&self) -> (&'static str, &'static str) {
        match self {
            Stage::FamilyConsumption => ("_Action", "_Consumption"),
            Stage::Weather => ("_Description", "_Value"),
            Stage::WeatherRange | Stage::FamilyTypes => ("-Value_Min", "-Value_Max"),
        }
    }

    /// Columns that lead every table of this stage, in order. The row key
    /// is among them.
    pub fn bookkeeping_columns(&self) -> &'static [&'static str] {
        match self {
            Stage::FamilyConsumption => &[
                "Country",
                "Family_Type",
                "Season",
                "Pattern",
                "Hour",
                "Total_Electricity_Usage",
            ],
            Stage::Weather => &["Country", "Season", "Hour"],
            Stage::WeatherRange | Stage::FamilyTypes => &["Country", "Season"],
        }
    }

    /// Only the consumption stage may legitimately repeat a group name
    /// (two members sharing a role label).
    pub fn disambiguates_names(&self) -> bool {
        matches!(self, Stage::FamilyConsumption)
    }

    pub fn computes_total_usage(&self) -> bool {
        matches!(self, Stage::FamilyConsumption)
    }

    pub fn repair_rules(&self) -> Vec<RepairRule> {
        match self {
            Stage::Weather | Stage::FamilyConsumption => vec![RepairRule::QuoteLabel {
                position: 1,
                numeric_lead: true,
            }],
            Stage::WeatherRange => vec![RepairRule::QuoteLabel {
                position: 0,
                numeric_lead: false,
            }],
            Stage::FamilyTypes => Vec::new(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "family_types" => Ok(Stage::FamilyTypes),
            "weather_range" => Ok(Stage::WeatherRange),
            "weather" => Ok(Stage::Weather),
            "family_consumption" => Ok(Stage::FamilyConsumption),
            other => Err(format!("Unknown stage: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_names() {
        assert_eq!("weather-range".parse::<Stage>().unwrap(), Stage::WeatherRange);
        assert_eq!("family_consumption".parse::<Stage>().unwrap(), Stage::FamilyConsumption);
        assert!("climate".parse::<Stage>().is_err());
    }

    #[test]
    fn test_bookkeeping_columns_contain_row_key() {
        for stage in [Stage::WeatherRange, Stage::Weather, Stage::FamilyConsumption] {
            let key = match stage.row_key() {
                RowKey::Hour => "Hour",
                RowKey::Season => "Season",
            };
            assert!(stage.bookkeeping_columns().contains(&key), "{}", stage);
        }
    }
}
