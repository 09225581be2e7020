//! Offset arithmetic over a source buffer: line boundaries, indentation, and
//! line-ending detection. All offsets are byte offsets.

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(buf: &str, offset: usize) -> usize {
    buf[..offset].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Offset of the `\n` ending the line containing `offset`, or `buf.len()`.
pub fn line_end(buf: &str, offset: usize) -> usize {
    buf[offset..].find('\n').map_or(buf.len(), |nl| offset + nl)
}

/// The run of spaces and tabs that opens the line containing `offset`.
pub fn leading_whitespace(buf: &str, offset: usize) -> &str {
    let start = line_start(buf, offset);
    let line = &buf[start..line_end(buf, offset)];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// 1-based line number of `offset`.
pub fn line_number(buf: &str, offset: usize) -> usize {
    buf.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

/// True when `s` holds nothing but horizontal whitespace (or a stray `\r`).
pub fn is_blank(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r'))
}

/// True when `s` is blank apart from `//` or `/* */` comments, so code
/// placed after it would still start a fresh line.
pub fn is_blank_or_comment(s: &str) -> bool {
    let mut rest = s.trim_start_matches([' ', '\t', '\r']);
    loop {
        if rest.is_empty() || rest.starts_with("//") {
            return true;
        }
        let Some(body) = rest.strip_prefix("/*") else {
            return false;
        };
        match body.find("*/") {
            Some(close) => rest = body[close + 2..].trim_start_matches([' ', '\t', '\r']),
            None => return false,
        }
    }
}

/// The line terminator a file predominantly uses.
pub fn line_ending(buf: &str) -> &'static str {
    if buf.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}
