// src/extraction/sentinel.rs
//! Delimiter Extractor
//!
//! Replies wrap their machine-readable part between a start and an end
//! marker (`$$MESSAGE_START$$ ... $$MESSAGE_END$$`). Models sometimes
//! restate the block, so the last complete span wins.

use serde::{Deserialize, Serialize};

/// Start/end marker tokens. Any `$` padding around the tokens is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelMarkers {
    pub start: String,
    pub end: String,
}

impl Default for SentinelMarkers {
    fn default() -> Self {
        Self {
            start: "MESSAGE_START".to_string(),
            end: "MESSAGE_END".to_string(),
        }
    }
}

impl SentinelMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Marker tokens with `$` padding removed, so both `MESSAGE_START` and
    /// `$$MESSAGE_START$$` configure the same markers.
    fn tokens(&self) -> (&str, &str) {
        (self.start.trim_matches('$'), self.end.trim_matches('$'))
    }
}

/// Every non-overlapping `start ... end` span in `text`, interior only,
/// in order of appearance. The interior match is non-greedy.
pub fn find_spans<'a>(text: &'a str, markers: &SentinelMarkers) -> Vec<&'a str> {
    let (start, end) = markers.tokens();
    let mut spans = Vec::new();
    if start.is_empty() || end.is_empty() {
        return spans;
    }

    let mut cursor = 0;
    while let Some(found) = text[cursor..].find(start) {
        let interior_start = cursor + found + start.len();
        let interior_start = interior_start
            + text[interior_start..]
                .bytes()
                .take_while(|b| *b == b'$')
                .count();
        let Some(end_found) = text[interior_start..].find(end) else {
            break;
        };
        let interior_end = interior_start + end_found;
        spans.push(text[interior_start..interior_end].trim_end_matches('$'));
        cursor = interior_end + end.len();
    }
    spans
}

/// The interior of the last complete span, untouched.
pub fn extract_raw<'a>(text: &'a str, markers: &SentinelMarkers) -> Option<&'a str> {
    find_spans(text, markers).pop().map(str::trim)
}

/// The last complete span with escapes and whitespace normalised. `None`
/// when the reply has no span, or only an empty one.
pub fn extract_payload(text: &str, markers: &SentinelMarkers) -> Option<String> {
    let raw = extract_raw(text, markers)?;
    let payload = normalize_payload(raw);
    (!payload.is_empty()).then_some(payload)
}

/// Turns escaped `\n`/`\t` sequences into real whitespace, drops line
/// breaks and collapses every whitespace run into a single space.
pub fn normalize_payload(raw: &str) -> String {
    let unescaped = raw.replace("\\n", "\n").replace("\\t", "\t");
    let joined: String = unescaped
        .trim()
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();

    let mut out = String::with_capacity(joined.len());
    let mut in_space = false;
    for c in joined.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> SentinelMarkers {
        SentinelMarkers::default()
    }

    #[test]
    fn test_extracts_between_padded_markers() {
        let text = "Thinking...\n$$MESSAGE_START$$\n#Temperature#[('Winter',-5,2)]\n$$MESSAGE_END$$ bye";
        assert_eq!(
            extract_payload(text, &markers()).as_deref(),
            Some("#Temperature#[('Winter',-5,2)]")
        );
    }

    #[test]
    fn test_last_span_wins() {
        let text = "MESSAGE_START draft MESSAGE_END then MESSAGE_START final MESSAGE_END";
        assert_eq!(extract_payload(text, &markers()).as_deref(), Some("final"));
        assert_eq!(find_spans(text, &markers()).len(), 2);
    }

    #[test]
    fn test_unterminated_trailing_span_is_ignored() {
        let text = "$$MESSAGE_START$$ one $$MESSAGE_END$$ $$MESSAGE_START$$ two";
        assert_eq!(extract_payload(text, &markers()).as_deref(), Some("one"));
    }

    #[test]
    fn test_missing_markers() {
        assert_eq!(extract_payload("no markers at all", &markers()), None);
        assert_eq!(extract_payload("MESSAGE_END before MESSAGE_START", &markers()), None);
        assert_eq!(extract_payload("$$MESSAGE_START$$ \n $$MESSAGE_END$$", &markers()), None);
    }

    #[test]
    fn test_escape_and_whitespace_normalisation() {
        assert_eq!(
            normalize_payload("#A#[(0,\\n 'x', 1)]\\n\\t#B#[(1,  'y',\t2)]"),
            "#A#[(0, 'x', 1)] #B#[(1, 'y', 2)]"
        );
        // Line breaks are removed, not turned into spaces.
        assert_eq!(normalize_payload("ab\ncd"), "abcd");
    }

    #[test]
    fn test_configured_markers_with_padding() {
        let custom = SentinelMarkers::new("$$BEGIN$$", "$$STOP$$");
        assert_eq!(
            extract_payload("x $$BEGIN$$ body $$STOP$$ y", &custom).as_deref(),
            Some("body")
        );
    }
}
