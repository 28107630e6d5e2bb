// src/extraction/literal.rs
//! Tolerant tuple tokenizer.
//!
//! Model output looks like tuple literals but is not held to any grammar.
//! The scanner here recognises just enough structure to be useful:
//!
//! - a tuple is `(` ... `)` with no `(` inside (outside quotes);
//! - fields are separated by top-level commas and trimmed;
//! - a quote opens a quoted field only at the start of a field, so an
//!   apostrophe inside an unquoted label (`Father's nap`) stays literal;
//! - a quote with no closing partner inside its own tuple is treated as a
//!   literal character.
//!
//! Field positions are byte ranges into the scanned text, which lets the
//! repair rules rewrite a single field and leave every other byte alone.

use std::fmt;

/// Trimmed byte range of one tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub start: usize,
    pub end: usize,
}

impl FieldSpan {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// A parenthesised tuple found in text. `start` is the `(`, `end` is one
/// past the `)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleSpan {
    pub start: usize,
    pub end: usize,
    pub fields: Vec<FieldSpan>,
}

impl TupleSpan {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn field<'a>(&self, source: &'a str, index: usize) -> Option<&'a str> {
        self.fields.get(index).map(|f| f.text(source))
    }
}

/// All tuples in `text`, left to right, non-overlapping.
pub fn scan_tuples(text: &str) -> Vec<TupleSpan> {
    let bytes = text.as_bytes();
    let mut tuples = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'(' {
            if let Some(tuple) = scan_tuple_at(bytes, i) {
                i = tuple.end;
                tuples.push(tuple);
                continue;
            }
        }
        i += 1;
    }
    tuples
}

fn scan_tuple_at(bytes: &[u8], open: usize) -> Option<TupleSpan> {
    let mut fields = Vec::new();
    let mut field_start = open + 1;
    let mut at_field_start = true;
    let mut i = open + 1;

    while i < bytes.len() {
        let b = bytes[i];
        if at_field_start && b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if at_field_start && (b == b'\'' || b == b'"') {
            at_field_start = false;
            if let Some(close) = closing_quote(bytes, i) {
                i = close + 1;
                continue;
            }
        }
        at_field_start = false;
        match b {
            b',' => {
                fields.push(trimmed(bytes, field_start, i));
                field_start = i + 1;
                at_field_start = true;
            }
            b')' => {
                fields.push(trimmed(bytes, field_start, i));
                return Some(TupleSpan {
                    start: open,
                    end: i + 1,
                    fields,
                });
            }
            // A nested opener restarts the tuple there.
            b'(' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Closing partner of the quote at `open`. An unbalanced `)` ends the
/// enclosing tuple, so the search stops there.
fn closing_quote(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut depth = 0usize;
    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j),
            b'(' => {
                depth += 1;
                j += 1;
            }
            b')' if depth == 0 => return None,
            b')' => {
                depth -= 1;
                j += 1;
            }
            _ => j += 1,
        }
    }
    None
}

fn trimmed(bytes: &[u8], mut start: usize, mut end: usize) -> FieldSpan {
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    FieldSpan { start, end }
}

/// True when the field text opens with a quote character.
pub fn is_quoted(field: &str) -> bool {
    field.starts_with('\'') || field.starts_with('"')
}

/// A numeric literal. Integers written without a fraction stay integral
/// so they are written back the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub value: f64,
    pub integral: bool,
}

impl Number {
    pub fn integer(value: i64) -> Self {
        Self {
            value: value as f64,
            integral: true,
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            value,
            integral: false,
        }
    }

    /// Rounded to `places` decimals; always non-integral. Negative zero
    /// comes out as zero.
    pub fn rounded(value: f64, places: i32) -> Self {
        let factor = 10f64.powi(places);
        Self::float((value * factor).round() / factor + 0.0)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let unsigned = text.strip_prefix('+').unwrap_or(text);
        if unsigned.is_empty() {
            return None;
        }
        if let Ok(int) = unsigned.parse::<i64>() {
            return Some(Self::integer(int));
        }
        // Rust accepts `inf`/`nan`; a tuple literal never does.
        if unsigned
            .bytes()
            .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
        {
            return None;
        }
        unsigned
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self::float)
    }

    /// The value as a whole number, if it was written as one.
    pub fn as_integer(&self) -> Option<i64> {
        self.integral.then_some(self.value as i64)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.integral {
            write!(f, "{}", self.value as i64)
        } else if self.value.fract() == 0.0 && self.value.abs() < 1e16 {
            write!(f, "{:.1}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(Number),
}

/// Parses one trimmed field. Quoted fields must be fully enclosed by a
/// matching quote pair; anything else must be a number.
pub fn parse_literal(field: &str) -> Result<Literal, String> {
    let field = field.trim();
    if field.is_empty() {
        return Err("empty field".to_string());
    }
    if is_quoted(field) {
        return unquote(field)
            .map(Literal::Str)
            .ok_or_else(|| format!("malformed string literal {}", field));
    }
    Number::parse(field)
        .map(Literal::Number)
        .ok_or_else(|| format!("expected a number, found {}", field))
}

fn unquote(field: &str) -> Option<String> {
    let quote = field.chars().next()?;
    if field.len() < 2 || !field.ends_with(quote) {
        return None;
    }
    let inner = &field[1..field.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == quote {
            // An unescaped quote inside means the literal ended early.
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(escaped @ ('\\' | '\'' | '"')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Vec<Vec<String>> {
        scan_tuples(text)
            .iter()
            .map(|t| t.fields.iter().map(|f| f.text(text).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_scan_simple_tuples() {
        assert_eq!(
            fields("(0, Sleeping, 0.02), (1,'Dozing', 0.01)"),
            vec![
                vec!["0", "Sleeping", "0.02"],
                vec!["1", "'Dozing'", "0.01"],
            ]
        );
    }

    #[test]
    fn test_quoted_comma_and_paren_stay_inside_field() {
        assert_eq!(
            fields("(3, 'Rain, heavy (storm)', 4.5)"),
            vec![vec!["3", "'Rain, heavy (storm)'", "4.5"]]
        );
    }

    #[test]
    fn test_apostrophe_inside_unquoted_label_is_literal() {
        assert_eq!(
            fields("(7, Father's nap, 0.1)"),
            vec![vec!["7", "Father's nap", "0.1"]]
        );
    }

    #[test]
    fn test_unterminated_quote_stays_inside_its_tuple() {
        assert_eq!(
            fields("(5, 'Lunch, 0.3), (6, 'Nap', 0.05), (7, 'Tv', 0.1)"),
            vec![
                vec!["5", "'Lunch", "0.3"],
                vec!["6", "'Nap'", "0.05"],
                vec!["7", "'Tv'", "0.1"],
            ]
        );
    }

    #[test]
    fn test_nested_opener_restarts_tuple() {
        assert_eq!(fields("(oops (1, a, 2)"), vec![vec!["1", "a", "2"]]);
        assert!(fields("(1, a, 2").is_empty());
    }

    #[test]
    fn test_number_parsing_and_display() {
        assert_eq!(Number::parse("-5").unwrap().to_string(), "-5");
        assert_eq!(Number::parse("2.0").unwrap().to_string(), "2.0");
        assert_eq!(Number::parse("+0.35").unwrap().to_string(), "0.35");
        assert_eq!(Number::parse("1e3").unwrap().to_string(), "1000.0");
        assert!(Number::parse("nan").is_none());
        assert!(Number::parse("inf").is_none());
        assert!(Number::parse("value").is_none());
        assert_eq!(Number::rounded(0.1 + 0.2, 2).to_string(), "0.3");
    }

    #[test]
    fn test_rounding_never_yields_negative_zero() {
        assert_eq!(Number::rounded(-0.0, 2).to_string(), "0.0");
        assert_eq!(Number::rounded(-0.001, 2).to_string(), "0.0");
        assert_eq!(Number::rounded(-0.006, 2).to_string(), "-0.01");
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("'Cold-clear'").unwrap(), Literal::Str("Cold-clear".into()));
        assert_eq!(parse_literal(r#""It's""#).unwrap(), Literal::Str("It's".into()));
        assert_eq!(parse_literal(r"'a\'b'").unwrap(), Literal::Str("a'b".into()));
        assert!(parse_literal("'unterminated").is_err());
        assert!(parse_literal("'a' b'").is_err());
        assert!(parse_literal("Cold").is_err());
        assert!(parse_literal("").is_err());
    }
}
