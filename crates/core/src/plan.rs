//! Insertion point planning: for one declaration, decide where the entry and
//! exit markers go and render the exact text inserted at each offset.
//!
//! Offsets in a plan refer to the unedited buffer. Edits are recorded in
//! strictly descending offset order, so applying them front to back never
//! shifts an offset that is still pending.

use tracing::{debug, warn};

use crate::classify::Classification;
use crate::position::{
    is_blank, is_blank_or_comment, leading_whitespace, line_end, line_ending, line_number,
    line_start,
};
use crate::types::{Declaration, MarkerKind, Markers, DEFAULT_INDENT};

/// A single insertion into the unedited buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub text: String,
}

/// All insertions for one declaration, in descending offset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    /// Start offset of the declaration the plan belongs to.
    pub decl_start: usize,
    pub edits: Vec<Edit>,
    pub entries: usize,
    pub exits: usize,
    /// Exits placed before a `return` that is the sole body of a branch or loop.
    pub unbraced: usize,
}

impl EditPlan {
    pub fn empty(decl_start: usize) -> Self {
        Self { decl_start, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Where a group of marker lines attaches relative to a body element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Immediately before the element starting at this offset.
    Before(usize),
    /// Right after the element ending at this offset.
    After(usize),
}

/// Plan the marker insertions for `decl`. Declarations without a body or with
/// a body too small to instrument produce an empty plan.
pub fn plan(
    decl: &Declaration,
    class: &Classification,
    buf: &str,
    markers: &Markers,
) -> EditPlan {
    let mut plan = EditPlan::empty(decl.start);
    let Some(body) = decl.body.as_deref() else {
        return plan;
    };
    if class.body_too_small {
        warn!(function = decl.name.as_str(), elements = body.len(), "Too little body, skipping");
        return plan;
    }

    let mut pending: Vec<(Anchor, MarkerKind)> = Vec::new();

    // Fall-through to the closing brace
    let last = &body[body.len() - 1];
    if class.may_fall_through() && !body[body.len() - 2].is_return() {
        pending.push((Anchor::After(last.end), MarkerKind::Exit));
    }

    for stmt in body.iter().rev().filter(|s| s.is_return()) {
        if stmt.unbraced {
            plan.unbraced += 1;
            debug!(
                function = decl.name.as_str(),
                line = line_number(buf, stmt.start),
                "Unbraced return"
            );
        }
        pending.push((Anchor::Before(stmt.start), MarkerKind::Exit));
    }

    pending.push((Anchor::Before(body[0].start), MarkerKind::Entry));

    // Merge markers sharing an anchor; earlier pending items sit later in the file.
    let mut groups: Vec<(Anchor, Vec<&str>)> = Vec::new();
    for (anchor, kind) in pending {
        match kind {
            MarkerKind::Entry => plan.entries += 1,
            MarkerKind::Exit => plan.exits += 1,
        }
        let literal = markers.literal(kind);
        match groups.last_mut() {
            Some((prev, lines)) if *prev == anchor => lines.insert(0, literal),
            _ => groups.push((anchor, vec![literal])),
        }
    }

    let eol = line_ending(buf);
    plan.edits = groups.into_iter().map(|(anchor, lines)| render(buf, anchor, &lines, eol)).collect();

    debug!(
        function = decl.name.as_str(),
        entries = plan.entries,
        exits = plan.exits,
        edits = plan.edits.len(),
        "Planned markers"
    );
    plan
}

/// Lay out marker lines at an anchor so each marker ends up alone on its line.
fn render(buf: &str, anchor: Anchor, lines: &[&str], eol: &str) -> Edit {
    match anchor {
        Anchor::Before(offset) => {
            let prefix = &buf[line_start(buf, offset)..offset];
            if is_blank(prefix) {
                // Element opens its line: markers take the line, the element
                // moves down with the same indentation.
                let mut text = String::new();
                for line in lines {
                    text.push_str(line);
                    text.push_str(eol);
                    text.push_str(prefix);
                }
                Edit { offset, text }
            } else {
                let indent = nested_indent(buf, offset);
                let mut text = String::from(eol);
                for line in lines {
                    push_line(&mut text, &indent, line, eol);
                }
                text.push_str(&indent);
                Edit { offset, text }
            }
        }
        Anchor::After(offset) => {
            let end = line_end(buf, offset);
            if end < buf.len() && is_blank_or_comment(&buf[offset..end]) {
                let indent = leading_whitespace(buf, offset);
                let mut text = String::new();
                for line in lines {
                    push_line(&mut text, indent, line, eol);
                }
                Edit { offset: end + 1, text }
            } else {
                let indent = nested_indent(buf, offset);
                let mut text = String::from(eol);
                for line in lines {
                    push_line(&mut text, &indent, line, eol);
                }
                Edit { offset, text }
            }
        }
    }
}

fn push_line(text: &mut String, indent: &str, line: &str, eol: &str) {
    text.push_str(indent);
    text.push_str(line);
    text.push_str(eol);
}

/// Indentation for a marker split off a line that also holds code.
fn nested_indent(buf: &str, offset: usize) -> String {
    format!("{}{DEFAULT_INDENT}", leading_whitespace(buf, offset))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::types::{DeclKind, StatementKind, StatementRef};

    /// Split the text between the first `{` and the last `}` into elements.
    pub(crate) fn lex_body(src: &str) -> Vec<StatementRef> {
        let open = src.find('{').unwrap() + 1;
        let close = src.rfind('}').unwrap();
        let bytes = src.as_bytes();
        let mut out = Vec::new();
        let mut i = open;
        while i < close {
            let c = bytes[i];
            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            let start = i;
            if c.is_ascii_alphanumeric() || c == b'_' {
                while i < close && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
            } else {
                i += 1;
            }
            let kind = match &src[start..i] {
                "return" => StatementKind::Return,
                ";" => StatementKind::Semicolon,
                _ => StatementKind::Other,
            };
            out.push(StatementRef::new(kind, start, i));
        }
        out
    }

    pub(crate) fn function(src: &str, return_type: Option<&str>) -> Declaration {
        Declaration {
            kind: DeclKind::FreeFunction,
            name: "f".to_string(),
            return_type: return_type.map(str::to_string),
            enclosing_class: None,
            body: Some(lex_body(src)),
            start: 0,
        }
    }

    fn plan_for(src: &str, decl: &Declaration) -> EditPlan {
        plan(decl, &classify(decl), src, &Markers::new("IN;", "OUT;"))
    }

    #[test]
    fn test_void_fall_through_gets_implicit_exit() {
        let src = "void f()\n{\n    a();\n    b();\n}\n";
        let p = plan_for(src, &function(src, Some("void")));
        assert_eq!((p.entries, p.exits), (1, 1));
        assert_eq!(p.edits.len(), 2);
        // Implicit exit lands at the start of the closing-brace line
        assert_eq!(p.edits[0], Edit { offset: src.rfind('}').unwrap(), text: "    OUT;\n".into() });
        assert_eq!(p.edits[1], Edit { offset: src.find("a()").unwrap(), text: "IN;\n    ".into() });
    }

    #[test]
    fn test_returns_get_exit_markers() {
        let src = "int f()\n{\n    if (c) {\n        return 1;\n    }\n    return 0;\n}\n";
        let p = plan_for(src, &function(src, Some("int")));
        assert_eq!((p.entries, p.exits), (1, 2));
        let offsets: Vec<usize> = p.edits.iter().map(|e| e.offset).collect();
        assert_eq!(
            offsets,
            vec![src.rfind("return").unwrap(), src.find("return").unwrap(), src.find("if").unwrap()]
        );
        assert_eq!(p.edits[1].text, "OUT;\n        ");
    }

    #[test]
    fn test_void_ending_in_return_has_no_implicit_exit() {
        let src = "void f()\n{\n    work();\n    return;\n}\n";
        let p = plan_for(src, &function(src, Some("void")));
        assert_eq!((p.entries, p.exits), (1, 1));
        assert_eq!(p.edits[0].offset, src.find("return").unwrap());
    }

    #[test]
    fn test_small_or_missing_body_is_skipped() {
        let src = "int f() { go; }";
        assert!(plan_for(src, &function(src, Some("int"))).is_empty());

        let mut decl = function(src, Some("int"));
        decl.body = None;
        assert!(plan_for(src, &decl).is_empty());
    }

    #[test]
    fn test_leading_return_merges_entry_and_exit() {
        let src = "int f()\n{\n    return 42;\n}\n";
        let p = plan_for(src, &function(src, Some("int")));
        assert_eq!(p.edits.len(), 1);
        assert_eq!(p.edits[0].text, "IN;\n    OUT;\n    ");
        assert_eq!((p.entries, p.exits), (1, 1));
    }

    #[test]
    fn test_one_line_body_breaks_markers_onto_own_lines() {
        let src = "void f(){ int x=1; }";
        let p = plan_for(src, &function(src, Some("void")));
        assert_eq!(p.edits.len(), 2);
        assert_eq!(p.edits[0], Edit { offset: src.find(';').unwrap() + 1, text: "\n    OUT;\n".into() });
        assert_eq!(p.edits[1], Edit { offset: src.find("int x").unwrap(), text: "\n    IN;\n    ".into() });
    }

    #[test]
    fn test_constructor_gets_implicit_exit() {
        let src = "Pool::Pool() : n(0)\n{\n    reset();\n}\n";
        let mut decl = function(src, None);
        decl.kind = DeclKind::Method;
        decl.name = "Pool".to_string();
        decl.enclosing_class = Some("Pool".to_string());
        let p = plan_for(src, &decl);
        assert_eq!((p.entries, p.exits), (1, 1));
        assert_eq!(p.edits[0].text, "    OUT;\n");
    }

    #[test]
    fn test_crlf_files_keep_their_line_endings() {
        let src = "void f()\r\n{\r\n    a();\r\n    b();\r\n}\r\n";
        let p = plan_for(src, &function(src, Some("void")));
        assert_eq!(p.edits[0].text, "    OUT;\r\n");
        assert_eq!(p.edits[1].text, "IN;\r\n    ");
    }

    #[test]
    fn test_trailing_comment_keeps_exit_on_next_line() {
        let src = "void f()\n{\n    a();\n    b(); // done\n}\n";
        let comment = src.find("//").unwrap();
        let mut decl = function(src, Some("void"));
        decl.body = Some(lex_body(src).into_iter().filter(|s| s.start < comment).collect());
        let p = plan_for(src, &decl);
        assert_eq!(p.edits[0], Edit { offset: src.rfind('}').unwrap(), text: "    OUT;\n".into() });
    }

    #[test]
    fn test_unbraced_returns_are_counted() {
        let src = "int f()\n{\n    if (c)\n        return 1;\n    return 0;\n}\n";
        let mut decl = function(src, Some("int"));
        if let Some(first) = decl.body.as_mut().and_then(|b| b.iter_mut().find(|s| s.is_return())) {
            first.unbraced = true;
        }
        let p = plan_for(src, &decl);
        assert_eq!((p.exits, p.unbraced), (2, 1));
    }

    #[test]
    fn test_edits_descend() {
        let src = "void f()\n{\n    if (a) {\n        return;\n    }\n    b();\n    return;\n}\n";
        let p = plan_for(src, &function(src, Some("void")));
        assert!(p.edits.windows(2).all(|w| w[0].offset > w[1].offset));
    }
}
