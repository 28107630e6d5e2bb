// src/extraction/events.rs
//! Run log events.
//!
//! A run log is line oriented. Each relevant line is a dictionary literal
//! `{'role': 'assistant', 'content': '...'}` (or the JSON equivalent).
//! Everything else in the log (timestamp markers, separators, stray prose)
//! is transcript noise and is skipped without complaint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tag of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Metadata,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Metadata => "metadata",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "metadata" => Some(Role::Metadata),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded log line. `line_index` is the zero-based line position and
/// the only ordering signal the matcher relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub line_index: usize,
    pub role: Role,
    pub content: String,
}

#[derive(Deserialize)]
struct JsonEvent {
    role: Role,
    #[serde(default)]
    content: String,
}

const DICT_ROLE_PREFIX: &str = "{'role': '";
const JSON_ROLE_PREFIX: &str = "{\"role\"";
const CONTENT_KEY: &str = "'content':";

impl Event {
    pub fn new(line_index: usize, role: Role, content: impl Into<String>) -> Self {
        Self {
            line_index,
            role,
            content: content.into(),
        }
    }

    /// Renders the event as a single dictionary-literal log line.
    pub fn to_log_line(&self) -> String {
        format!(
            "{{'role': '{}', 'content': {}}}",
            self.role,
            quote_literal(&self.content)
        )
    }
}

/// Decodes every recognised line of a run log, preserving log order.
pub fn parse_events(log: &str) -> Vec<Event> {
    log.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            decode_line(line).map(|(role, content)| Event::new(idx, role, content))
        })
        .collect()
}

/// Decodes one line. Returns `None` for noise.
pub fn decode_line(line: &str) -> Option<(Role, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix(DICT_ROLE_PREFIX) {
        let tag_end = rest.find('\'')?;
        let role = Role::from_tag(&rest[..tag_end])?;
        let after_role = &rest[tag_end + 1..];
        let content = match after_role.find(CONTENT_KEY) {
            Some(pos) => decode_content_literal(&after_role[pos + CONTENT_KEY.len()..]),
            None => String::new(),
        };
        return Some((role, content));
    }
    if line.starts_with(JSON_ROLE_PREFIX) {
        return serde_json::from_str::<JsonEvent>(line)
            .ok()
            .map(|e| (e.role, e.content));
    }
    None
}

/// Reads a quoted string literal at the start of `text` (after optional
/// whitespace). An unterminated literal yields everything up to the
/// closing brace of the line.
fn decode_content_literal(text: &str) -> String {
    let text = text.trim_start();
    let mut chars = text.chars();
    let quote = match chars.next() {
        Some(q @ ('\'' | '"')) => q,
        _ => return text.trim_end().trim_end_matches('}').trim_end().to_string(),
    };

    let mut out = String::with_capacity(text.len());
    let mut chars = chars.peekable();
    while let Some(c) = chars.next() {
        if c == quote {
            return out;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => push_hex_escape(&mut chars, 2, &mut out, 'x'),
            Some('u') => push_hex_escape(&mut chars, 4, &mut out, 'u'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    // Unterminated: drop the closing `'}` style tail if present.
    let trimmed = out.trim_end();
    let trimmed = trimmed.strip_suffix('}').unwrap_or(trimmed);
    trimmed.strip_suffix(quote).unwrap_or(trimmed).to_string()
}

fn push_hex_escape<I: Iterator<Item = char>>(
    chars: &mut std::iter::Peekable<I>,
    width: usize,
    out: &mut String,
    marker: char,
) {
    let mut digits = String::with_capacity(width);
    while digits.len() < width {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    let decoded = (digits.len() == width)
        .then(|| u32::from_str_radix(&digits, 16).ok())
        .flatten()
        .and_then(char::from_u32);
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(marker);
            out.push_str(&digits);
        }
    }
}

/// Quotes `content` the way a dictionary-literal renderer would: single
/// quotes unless the text contains a single quote and no double quote.
fn quote_literal(content: &str) -> String {
    let quote = if content.contains('\'') && !content.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(content.len() + 2);
    out.push(quote);
    for c in content.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dict_literal_line() {
        let line = r#"{'role': 'assistant', 'content': 'Sure!\n$$MESSAGE_START$$ data $$MESSAGE_END$$'}"#;
        let (role, content) = decode_line(line).unwrap();
        assert_eq!(role, Role::Assistant);
        assert_eq!(content, "Sure!\n$$MESSAGE_START$$ data $$MESSAGE_END$$");
    }

    #[test]
    fn test_decode_double_quoted_content() {
        let line = r#"{'role': 'assistant', 'content': "(3,'Cold',-2.0)"}"#;
        let (_, content) = decode_line(line).unwrap();
        assert_eq!(content, "(3,'Cold',-2.0)");
    }

    #[test]
    fn test_decode_json_line() {
        let line = r#"{"role": "metadata", "content": "Country, USA"}"#;
        let (role, content) = decode_line(line).unwrap();
        assert_eq!(role, Role::Metadata);
        assert_eq!(content, "Country, USA");
    }

    #[test]
    fn test_noise_lines_are_skipped() {
        let log = "[2025-01-01_T10-00-00]\n----------\n{'role': 'user', 'content': 'hi'}\nrandom prose\n";
        let events = parse_events(log);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].line_index, 2);
        assert_eq!(events[0].role, Role::User);
    }

    #[test]
    fn test_unknown_role_is_noise() {
        assert!(decode_line("{'role': 'tool', 'content': 'x'}").is_none());
        assert!(decode_line("  {'role': 'assistant', 'content': 'x'}").is_none());
    }

    #[test]
    fn test_log_line_survives_decoding() {
        let event = Event::new(0, Role::Assistant, "It's a 'quoted' \"mix\"\nwith\ttabs \\ done");
        let (role, content) = decode_line(&event.to_log_line()).unwrap();
        assert_eq!(role, Role::Assistant);
        assert_eq!(content, event.content);
    }

    #[test]
    fn test_unterminated_literal_keeps_text() {
        let (_, content) = decode_line("{'role': 'assistant', 'content': 'cut off here").unwrap();
        assert_eq!(content, "cut off here");
    }
}
