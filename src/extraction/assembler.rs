// src/extraction/assembler.rs
//! Record Assembler
//!
//! Turns the field groups of one reply into a single denormalised table.
//!
//! ## Responsibilities
//!
//! - Give each group two value columns named after the group
//! - Outer-join all groups on the row key (`Hour` or `Season`)
//! - Lead every row with the stage's bookkeeping columns
//! - Compute `Total_Electricity_Usage` for the consumption stage
//!
//! Hourly tables always carry all 24 hours, so a parameter that skipped an
//! hour leaves an empty cell instead of dropping the row.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::bookkeeping::BookkeepingRecord;
use super::diagnostics::DiagnosticKind;
use super::groups::{FieldGroup, FieldTuple};
use super::literal::Number;
use super::stage::{RowKey, Stage, HOURS_PER_DAY};

pub const TOTAL_USAGE_COLUMN: &str = "Total_Electricity_Usage";

/// Column naming options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnNaming {
    /// Remove possessive artefacts (`'s`, `-s`) from group names.
    pub strip_possessives: bool,
}

impl Default for ColumnNaming {
    fn default() -> Self {
        Self {
            strip_possessives: true,
        }
    }
}

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(Number),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Number(number) => write!(f, "{}", number),
        }
    }
}

/// Column-oriented record set for one bookkeeping record.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTable {
    pub stage: Stage,
    pub file_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl AssembledTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Row whose key column renders as `key`.
    #[cfg(test)]
    pub fn row_by_key(&self, key: &str) -> Option<&[Cell]> {
        let key_column = match self.stage.row_key() {
            RowKey::Hour => "Hour",
            RowKey::Season => "Season",
        };
        let idx = self.column_index(key_column)?;
        self.rows
            .iter()
            .find(|r| r.get(idx).map(|c| c.to_string()).as_deref() == Some(key))
            .map(Vec::as_slice)
    }
}

/// Assembly result: the table (when any value survived) and the problems
/// met along the way.
#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    pub table: Option<AssembledTable>,
    pub issues: Vec<DiagnosticKind>,
}

/// Base column name for a group: spaces become hyphens, possessive
/// artefacts are optionally removed.
pub fn column_base_name(group_name: &str, naming: &ColumnNaming) -> String {
    let safe = group_name.trim().replace(' ', "-");
    if naming.strip_possessives {
        strip_possessive(&safe)
    } else {
        safe
    }
}

/// Drops `'s`, and `-s` when it ends a word (before `-`, `_` or the end).
fn strip_possessive(name: &str) -> String {
    let without_apostrophe = name.replace("'s", "");
    let mut out = String::with_capacity(without_apostrophe.len());
    let mut rest = without_apostrophe.as_str();
    while let Some(pos) = rest.find("-s") {
        let after = &rest[pos + 2..];
        let ends_word = after.is_empty() || after.starts_with('-') || after.starts_with('_');
        if ends_word && pos > 0 {
            out.push_str(&rest[..pos]);
        } else {
            out.push_str(&rest[..pos + 2]);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Cells of one group, keyed by row.
struct GroupColumns {
    cells: HashMap<usize, (Cell, Cell)>,
}

/// Assembles the groups of one reply into a table.
pub fn assemble(
    groups: &[FieldGroup],
    record: &BookkeepingRecord,
    naming: &ColumnNaming,
) -> AssemblyOutcome {
    let stage = record.stage;
    let (first_suffix, second_suffix) = stage.value_suffixes();
    let fixed_columns = stage.bookkeeping_columns();

    let mut issues = Vec::new();
    let mut used_names: HashSet<String> = fixed_columns.iter().map(|c| c.to_string()).collect();
    let mut data_columns: Vec<String> = Vec::new();
    let mut group_columns: Vec<GroupColumns> = Vec::new();

    let mut season_keys: Vec<String> = Vec::new();
    let mut season_rows: HashMap<String, usize> = HashMap::new();
    let mut any_value = false;

    for group in groups {
        let Some(base) = pick_base_name(&group.name, naming, first_suffix, second_suffix, &used_names)
        else {
            issues.push(DiagnosticKind::DuplicateGroup {
                group: group.name.clone(),
            });
            continue;
        };
        let first = format!("{}{}", base, first_suffix);
        let second = format!("{}{}", base, second_suffix);
        used_names.insert(first.clone());
        used_names.insert(second.clone());
        data_columns.push(first);
        data_columns.push(second);

        if group.tuples.is_empty() {
            issues.push(DiagnosticKind::EmptyGroup {
                group: group.name.clone(),
            });
        }

        let mut cells: HashMap<usize, (Cell, Cell)> = HashMap::new();
        for tuple in &group.tuples {
            let (row, key, pair) = match tuple {
                FieldTuple::Hourly { hour, label, value } => {
                    if !(0..i64::from(HOURS_PER_DAY)).contains(hour) {
                        issues.push(DiagnosticKind::InvalidKey {
                            group: group.name.clone(),
                            key: hour.to_string(),
                        });
                        continue;
                    }
                    (
                        *hour as usize,
                        hour.to_string(),
                        (Cell::Text(label.clone()), Cell::Number(*value)),
                    )
                }
                FieldTuple::Seasonal { season, min, max } => {
                    if season.is_empty() {
                        issues.push(DiagnosticKind::InvalidKey {
                            group: group.name.clone(),
                            key: season.clone(),
                        });
                        continue;
                    }
                    let row = match season_rows.get(season) {
                        Some(row) => *row,
                        None => {
                            season_keys.push(season.clone());
                            season_rows.insert(season.clone(), season_keys.len() - 1);
                            season_keys.len() - 1
                        }
                    };
                    (row, season.clone(), (Cell::Number(*min), Cell::Number(*max)))
                }
            };
            if cells.contains_key(&row) {
                issues.push(DiagnosticKind::DuplicateKey {
                    group: group.name.clone(),
                    key,
                });
                continue;
            }
            cells.insert(row, pair);
            any_value = true;
        }
        group_columns.push(GroupColumns { cells });
    }

    if !any_value {
        issues.push(DiagnosticKind::NoUsableRows);
        return AssemblyOutcome { table: None, issues };
    }

    let row_count = match stage.row_key() {
        RowKey::Hour => usize::from(HOURS_PER_DAY),
        RowKey::Season => season_keys.len(),
    };

    let rows = (0..row_count)
        .map(|row| {
            let mut out = Vec::with_capacity(fixed_columns.len() + data_columns.len());
            for column in fixed_columns {
                out.push(fixed_cell(column, row, record, &season_keys, &group_columns));
            }
            for group in &group_columns {
                match group.cells.get(&row) {
                    Some((a, b)) => {
                        out.push(a.clone());
                        out.push(b.clone());
                    }
                    None => {
                        out.push(Cell::Empty);
                        out.push(Cell::Empty);
                    }
                }
            }
            out
        })
        .collect();

    let mut columns: Vec<String> = fixed_columns.iter().map(|c| c.to_string()).collect();
    columns.extend(data_columns);

    AssemblyOutcome {
        table: Some(AssembledTable {
            stage,
            file_name: record.output_file_name(),
            columns,
            rows,
        }),
        issues,
    }
}

/// First free base name: normalised if possible, else the plain name.
fn pick_base_name(
    group_name: &str,
    naming: &ColumnNaming,
    first_suffix: &str,
    second_suffix: &str,
    used: &HashSet<String>,
) -> Option<String> {
    let normalised = column_base_name(group_name, naming);
    let plain = column_base_name(group_name, &ColumnNaming { strip_possessives: false });
    [normalised, plain].into_iter().find(|base| {
        !base.is_empty()
            && !used.contains(&format!("{}{}", base, first_suffix))
            && !used.contains(&format!("{}{}", base, second_suffix))
    })
}

fn fixed_cell(
    column: &str,
    row: usize,
    record: &BookkeepingRecord,
    season_keys: &[String],
    groups: &[GroupColumns],
) -> Cell {
    match (column, record.stage.row_key()) {
        ("Hour", RowKey::Hour) => Cell::Number(Number::integer(row as i64)),
        ("Season", RowKey::Season) => Cell::Text(season_keys[row].clone()),
        (TOTAL_USAGE_COLUMN, _) => {
            let total: f64 = groups
                .iter()
                .filter_map(|g| match g.cells.get(&row) {
                    Some((_, Cell::Number(n))) => Some(n.value),
                    _ => None,
                })
                .fold(0.0, |acc, v| acc + v);
            Cell::Number(Number::rounded(total, 2))
        }
        (other, _) => record
            .column_value(other)
            .map(|v| Cell::Text(v.to_string()))
            .unwrap_or(Cell::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::groups::{disambiguate, split_groups};

    fn family_record() -> BookkeepingRecord {
        BookkeepingRecord::parse(
            "Country, USA, Family Type, Couple, Members, [Son|Son], Season, Winter, Pattern, Weekday",
            Stage::FamilyConsumption,
        )
        .unwrap()
    }

    fn texts(table: &AssembledTable, row: usize) -> Vec<String> {
        table.rows[row].iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_weather_range_scenario() {
        let split = split_groups("#Temperature#[('Winter',-5,2),('Summer',20,35)]", Stage::WeatherRange);
        let record = BookkeepingRecord::for_country(Stage::WeatherRange, "USA");
        let outcome = assemble(&split.groups, &record, &ColumnNaming::default());
        let table = outcome.table.unwrap();
        assert_eq!(
            table.columns,
            vec!["Country", "Season", "Temperature-Value_Min", "Temperature-Value_Max"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(texts(&table, 0), vec!["USA", "Winter", "-5", "2"]);
        assert_eq!(texts(&table, 1), vec!["USA", "Summer", "20", "35"]);
        assert_eq!(table.file_name, "USA_weather_min_max.csv");
    }

    #[test]
    fn test_weather_range_outer_join_keeps_all_seasons() {
        let split = split_groups(
            "#Temperature#[('Winter',-5,2)] #Humidity#[('Summer',40,70),('Winter',30,60)]",
            Stage::WeatherRange,
        );
        let record = BookkeepingRecord::for_country(Stage::WeatherRange, "USA");
        let table = assemble(&split.groups, &record, &ColumnNaming::default()).table.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(texts(&table, 0), vec!["USA", "Winter", "-5", "2", "30", "60"]);
        assert_eq!(texts(&table, 1), vec!["USA", "Summer", "", "", "40", "70"]);
    }

    #[test]
    fn test_weather_table_always_has_24_hours() {
        let split = split_groups(
            "#Temperature#[(0, 'Cold', 1.5), (12, 'Mild', 8.0)] #Humidity#[(5, 'Damp', 80)]",
            Stage::Weather,
        );
        let mut record = BookkeepingRecord::for_country(Stage::Weather, "Sweden");
        record.season = Some("Winter".into());
        let outcome = assemble(&split.groups, &record, &ColumnNaming::default());
        let table = outcome.table.unwrap();
        assert_eq!(table.rows.len(), 24);
        assert_eq!(
            table.columns,
            vec![
                "Country",
                "Season",
                "Hour",
                "Temperature_Description",
                "Temperature_Value",
                "Humidity_Description",
                "Humidity_Value"
            ]
        );
        assert_eq!(texts(&table, 5), vec!["Sweden", "Winter", "5", "", "", "Damp", "80"]);
        assert_eq!(texts(&table, 12)[4], "8.0");
        assert_eq!(texts(&table, 23), vec!["Sweden", "Winter", "23", "", "", "", ""]);
    }

    #[test]
    fn test_total_usage_sums_consumption_columns() {
        let mut split = split_groups(
            "#Son#[(5, 'Lunch', 0.3)] #Son#[(5, 'Lunch', 0.3), (6, 'Nap', 0.05)]",
            Stage::FamilyConsumption,
        );
        disambiguate(&mut split.groups);
        let table = assemble(&split.groups, &family_record(), &ColumnNaming::default())
            .table
            .unwrap();
        assert_eq!(
            table.columns,
            vec![
                "Country",
                "Family_Type",
                "Season",
                "Pattern",
                "Hour",
                "Total_Electricity_Usage",
                "Son_Action",
                "Son_Consumption",
                "Son_01_Action",
                "Son_01_Consumption"
            ]
        );
        assert_eq!(table.cell(5, TOTAL_USAGE_COLUMN).unwrap().to_string(), "0.6");
        assert_eq!(table.cell(6, TOTAL_USAGE_COLUMN).unwrap().to_string(), "0.05");
        assert_eq!(table.cell(0, TOTAL_USAGE_COLUMN).unwrap().to_string(), "0.0");
        assert_eq!(table.file_name, "USA_Couple_Winter_Weekday.csv");
    }

    #[test]
    fn test_invalid_and_duplicate_hours_are_reported() {
        let split = split_groups(
            "#Temperature#[(24, 'Late', 1), (3, 'A', 1), (3, 'B', 2)]",
            Stage::Weather,
        );
        let mut record = BookkeepingRecord::for_country(Stage::Weather, "USA");
        record.season = Some("Summer".into());
        let outcome = assemble(&split.groups, &record, &ColumnNaming::default());
        assert!(outcome
            .issues
            .iter()
            .any(|i| matches!(i, DiagnosticKind::InvalidKey { key, .. } if key == "24")));
        assert!(outcome
            .issues
            .iter()
            .any(|i| matches!(i, DiagnosticKind::DuplicateKey { key, .. } if key == "3")));
        let table = outcome.table.unwrap();
        assert_eq!(table.cell(3, "Temperature_Description").unwrap().to_string(), "A");
    }

    #[test]
    fn test_groups_without_values_produce_no_table() {
        let split = split_groups("#Temperature#[(0, 'Cold')]", Stage::Weather);
        let record = BookkeepingRecord::for_country(Stage::Weather, "USA");
        let outcome = assemble(&split.groups, &record, &ColumnNaming::default());
        assert!(outcome.table.is_none());
        assert!(outcome.issues.contains(&DiagnosticKind::NoUsableRows));
    }

    #[test]
    fn test_duplicate_group_without_disambiguation_is_dropped() {
        let split = split_groups(
            "#Temperature#[(0, 'Cold', 1)] #Temperature#[(0, 'Warm', 20)]",
            Stage::Weather,
        );
        let record = BookkeepingRecord::for_country(Stage::Weather, "USA");
        let outcome = assemble(&split.groups, &record, &ColumnNaming::default());
        let table = outcome.table.unwrap();
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.cell(0, "Temperature_Description").unwrap().to_string(), "Cold");
        assert!(outcome
            .issues
            .contains(&DiagnosticKind::DuplicateGroup { group: "Temperature".into() }));
    }

    #[test]
    fn test_possessive_stripping() {
        let naming = ColumnNaming::default();
        assert_eq!(column_base_name("Father's Helper", &naming), "Father-Helper");
        assert_eq!(column_base_name("Father-s", &naming), "Father");
        assert_eq!(column_base_name("Father-s_01", &naming), "Father_01");
        assert_eq!(column_base_name("Grand-son", &naming), "Grand-son");
        assert_eq!(column_base_name("Wind Speed", &naming), "Wind-Speed");

        let keep = ColumnNaming { strip_possessives: false };
        assert_eq!(column_base_name("Father's Helper", &keep), "Father's-Helper");
    }

    #[test]
    fn test_stripping_collision_falls_back_to_plain_name() {
        let split = split_groups(
            "#Father#[(0, 'Sleep', 0.1)] #Father's#[(0, 'Sleep', 0.2)]",
            Stage::FamilyConsumption,
        );
        let table = assemble(&split.groups, &family_record(), &ColumnNaming::default())
            .table
            .unwrap();
        assert!(table.column_index("Father_Consumption").is_some());
        assert!(table.column_index("Father's_Consumption").is_some());
        assert_eq!(table.cell(0, TOTAL_USAGE_COLUMN).unwrap().to_string(), "0.3");
    }

    #[test]
    fn test_row_by_key() {
        let split = split_groups("#Temperature#[('Winter',-5,2)]", Stage::WeatherRange);
        let record = BookkeepingRecord::for_country(Stage::WeatherRange, "USA");
        let table = assemble(&split.groups, &record, &ColumnNaming::default()).table.unwrap();
        let row = table.row_by_key("Winter").unwrap();
        assert_eq!(row[2].to_string(), "-5");
        assert!(table.row_by_key("Spring").is_none());
    }
}
