//! Marker removal: drop every line that contains one of the marker literals.
//!
//! Matching lines are tagged in one scan of the unmodified text and the
//! survivors are copied out in a single rewrite.

use std::ops::Range;

/// Byte spans of whole lines (terminator included) containing any literal.
pub fn marker_lines(text: &str, markers: &[&str]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if markers.iter().any(|m| !m.is_empty() && line.contains(m)) {
            spans.push(offset..offset + line.len());
        }
        offset += line.len();
    }
    spans
}

/// Remove every marker line from `text`.
pub fn strip(text: &str, markers: &[&str]) -> String {
    let spans = marker_lines(text, markers);
    if spans.is_empty() {
        return text.to_string();
    }
    let removed: usize = spans.iter().map(|s| s.len()).sum();
    let mut out = String::with_capacity(text.len() - removed);
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
