// src/extraction/repair.rs
//! Tuple Repair Engine
//!
//! Models often leave the text field of a tuple unquoted, e.g.
//! `(3,Cold-clear,-2.0)` instead of `(3,'Cold-clear',-2.0)`. Each
//! [`RepairRule`] fixes one such near miss over the whole payload before it
//! is split into field groups. A label with an opening quote but no closing
//! one is requoted as well. Rules only touch the field they target, so
//! text that already has the expected shape passes through unchanged and
//! applying a rule twice equals applying it once.

use super::literal::{is_quoted, scan_tuples};
use super::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairRule {
    /// Quote the field at `position` of every tuple when it is unquoted.
    /// With `numeric_lead`, only tuples whose first field is a run of
    /// digits (an hour) qualify.
    QuoteLabel { position: usize, numeric_lead: bool },
}

impl RepairRule {
    pub fn apply(&self, payload: &str) -> String {
        match *self {
            RepairRule::QuoteLabel {
                position,
                numeric_lead,
            } => quote_label_field(payload, position, numeric_lead),
        }
    }
}

/// Applies every rule of `stage`, in order.
pub fn repair(payload: &str, stage: Stage) -> String {
    stage
        .repair_rules()
        .iter()
        .fold(payload.to_string(), |text, rule| rule.apply(&text))
}

fn quote_label_field(payload: &str, position: usize, numeric_lead: bool) -> String {
    let mut out = String::with_capacity(payload.len() + 16);
    let mut copied_to = 0;

    for tuple in scan_tuples(payload) {
        let Some(field) = tuple.fields.get(position) else {
            continue;
        };
        if numeric_lead {
            let lead = tuple.field(payload, 0).unwrap_or("");
            if lead.is_empty() || !lead.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
        }
        let label = field.text(payload);
        let replacement = if is_quoted(label) {
            if is_closed(label) {
                continue;
            }
            // Opened but never closed: requote the text after the quote.
            let inner = label[1..].trim();
            if inner.is_empty() {
                continue;
            }
            quote_label(inner)
        } else if label.is_empty() {
            continue;
        } else {
            quote_label(label)
        };
        out.push_str(&payload[copied_to..field.start]);
        out.push_str(&replacement);
        copied_to = field.end;
    }

    out.push_str(&payload[copied_to..]);
    out
}

fn is_closed(label: &str) -> bool {
    let quote = &label[..1];
    label.len() >= 2 && label.ends_with(quote)
}

/// Single quotes unless the label itself holds one.
fn quote_label(label: &str) -> String {
    if !label.contains('\'') {
        format!("'{}'", label)
    } else if !label.contains('"') {
        format!("\"{}\"", label)
    } else {
        format!("'{}'", label.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOURLY: RepairRule = RepairRule::QuoteLabel {
        position: 1,
        numeric_lead: true,
    };
    const SEASONAL: RepairRule = RepairRule::QuoteLabel {
        position: 0,
        numeric_lead: false,
    };

    #[test]
    fn test_quotes_hourly_label() {
        assert_eq!(HOURLY.apply("(3,Cold-clear,-2.0)"), "(3,'Cold-clear',-2.0)");
        assert_eq!(
            HOURLY.apply("#Temperature#[(0, Clear night, 12.5), (1, 'Cool', 11)]"),
            "#Temperature#[(0, 'Clear night', 12.5), (1, 'Cool', 11)]"
        );
    }

    #[test]
    fn test_hourly_rule_requires_numeric_lead() {
        assert_eq!(HOURLY.apply("(Winter, cold, 2)"), "(Winter, cold, 2)");
        assert_eq!(HOURLY.apply("(-1, cold, 2)"), "(-1, cold, 2)");
    }

    #[test]
    fn test_quotes_season_label() {
        assert_eq!(
            SEASONAL.apply("#Humidity#[(Winter,30,60),('Summer',50,80)]"),
            "#Humidity#[('Winter',30,60),('Summer',50,80)]"
        );
    }

    #[test]
    fn test_label_with_apostrophe_uses_double_quotes() {
        assert_eq!(
            HOURLY.apply("(12, Mother's lunch, 0.4)"),
            "(12, \"Mother's lunch\", 0.4)"
        );
    }

    #[test]
    fn test_label_with_both_quote_kinds_is_escaped() {
        assert_eq!(HOURLY.apply(r#"(1, a'b"c, 2)"#), r#"(1, 'a\'b"c', 2)"#);
    }

    #[test]
    fn test_closes_unterminated_label() {
        assert_eq!(
            HOURLY.apply("(5, 'Lunch, 0.3), (6, 'Nap', 0.05)"),
            "(5, 'Lunch', 0.3), (6, 'Nap', 0.05)"
        );
        assert_eq!(SEASONAL.apply("(\"Winter,-5,2)"), "('Winter',-5,2)");
        assert_eq!(HOURLY.apply("(5, ', 0.3)"), "(5, ', 0.3)");
    }

    #[test]
    fn test_well_formed_payload_passes_through() {
        let payload = "#Son#[(0, 'Sleeping', 0.02), (1, \"Reading\", 0.05)] >>>MEMBERS>>> noise";
        assert_eq!(repair(payload, Stage::FamilyConsumption), payload);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let samples = [
            "#Temperature#[(0, Clear, 1.5), (1,Cloudy ,2), (2, 'Rain', 3)]",
            "#Father#[(7, Father's breakfast, 0.3), (8, a'b\"c, 0.1), (9,,0)]",
            "#Temperature#[(Winter,-5,2),(Summer, 20, 35)] trailing (text",
            "#Son#[(5, 'Lunch, 0.3), (6, 'Nap', 0.05), ('Summer,1,2)]",
            "no tuples here",
        ];
        for stage in [Stage::WeatherRange, Stage::Weather, Stage::FamilyConsumption] {
            for sample in samples {
                let once = repair(sample, stage);
                assert_eq!(repair(&once, stage), once, "{} / {}", stage, sample);
            }
        }
    }
}
