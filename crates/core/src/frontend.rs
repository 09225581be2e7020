//! Parser adapter: tree-sitter C / C++ parsing into [`Declaration`]s.
//!
//! The rest of the crate only sees the [`Frontend`] trait and the plain data
//! in [`crate::types`], so another C/C++ front end can be dropped in without
//! touching planning or patching.

use std::path::Path;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use crate::error::FrontendError;
use crate::position::{is_blank, line_end, line_number, line_start};
use crate::types::{DeclKind, Declaration, StatementKind, StatementRef};

/// Anything that can turn source text into function declarations.
pub trait Frontend {
    fn parse(&self, source: &str, path: &Path) -> Result<Vec<Declaration>, FrontendError>;
}

/// The bundled tree-sitter front end.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterFrontend;

// ---------------------------------------------------------------------------
// Language resolution
// ---------------------------------------------------------------------------

/// `.c` files get the C grammar; everything else is parsed as C++.
fn language_for_ext(ext: &str) -> Language {
    match ext {
        "c" => tree_sitter_c::LANGUAGE.into(),
        _ => tree_sitter_cpp::LANGUAGE.into(),
    }
}

impl Frontend for TreeSitterFrontend {
    fn parse(&self, source: &str, path: &Path) -> Result<Vec<Declaration>, FrontendError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mut parser = Parser::new();
        parser
            .set_language(&language_for_ext(ext))
            .map_err(|e| FrontendError::Grammar(e.to_string()))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| FrontendError::Grammar("parser produced no tree".to_string()))?;

        let root = tree.root_node();
        let bytes = source.as_bytes();
        if root.has_error() {
            return Err(syntax_error(root, source, ext != "c"));
        }

        let mut decls = Vec::new();
        collect(&root, bytes, &Scope::File, &mut decls);
        debug!(path = %path.display(), declarations = decls.len(), "Parsed declarations");
        Ok(decls)
    }
}

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error);
    found
}

/// Unterminated literals and comments are lexical errors; anything else is a parse error.
fn syntax_error(root: Node, source: &str, raw_strings: bool) -> FrontendError {
    if let Some((offset, detail)) = unterminated_token(source, raw_strings) {
        return FrontendError::Lex { line: line_number(source, offset), detail: detail.to_string() };
    }

    let Some(node) = first_error(root) else {
        return FrontendError::Parse { line: 1, detail: "syntax error".to_string() };
    };
    let line = node.start_position().row + 1;
    if node.is_missing() {
        return FrontendError::Parse { line, detail: format!("missing `{}`", node.kind()) };
    }
    let text = node.utf8_text(source.as_bytes()).unwrap_or("").trim_start();
    let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
    FrontendError::Parse { line, detail: format!("unexpected `{snippet}`") }
}

const CHAR_PREFIXES: &[&str] = &["", "L", "u", "U", "u8"];
const RAW_PREFIXES: &[&str] = &["R", "LR", "uR", "UR", "u8R"];

/// Offset of the first string, character literal or block comment that never
/// closes, with a description.
///
/// Tree-sitter recovers from these by wrapping the surrounding statement or
/// function in an ERROR node, so they are found by scanning the text instead.
fn unterminated_token(src: &str, raw_strings: bool) -> Option<(usize, &'static str)> {
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(src, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => match src[i + 2..].find("*/") {
                Some(close) => i += close + 4,
                None => return Some((i, "unterminated comment")),
            },
            // `#error don't` is free text
            b'#' if is_blank(&src[line_start(src, i)..i]) && is_diagnostic(&src[i + 1..]) => {
                i = line_end(src, i);
            }
            b'"' if raw_strings && RAW_PREFIXES.contains(&ident_before(src, i)) => {
                match raw_string_end(src, i) {
                    Some(end) => i = end,
                    None => return Some((i, "unterminated raw string literal")),
                }
            }
            b'"' => match quoted_end(bytes, i) {
                Some(end) => i = end,
                None => return Some((i, "unterminated string literal")),
            },
            // A quote after anything but an encoding prefix is a digit separator
            b'\'' if CHAR_PREFIXES.contains(&ident_before(src, i)) => match quoted_end(bytes, i) {
                Some(end) => i = end,
                None => return Some((i, "unterminated character literal")),
            },
            _ => i += 1,
        }
    }
    None
}

fn is_diagnostic(directive: &str) -> bool {
    let word = directive.trim_start_matches([' ', '\t']);
    word.starts_with("error") || word.starts_with("warning")
}

/// Identifier characters immediately before `offset`.
fn ident_before(src: &str, offset: usize) -> &str {
    let start = src[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map_or(offset, |(p, _)| p);
    &src[start..offset]
}

/// End of the literal opened by the quote at `open`, or `None` when a bare
/// newline or the end of input comes first. Escaped newlines continue it.
fn quoted_end(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut j = open + 1;
    loop {
        match *bytes.get(j)? {
            b'\\' if bytes.get(j + 1) == Some(&b'\r') => j += 3,
            b'\\' => j += 2,
            b'\n' => return None,
            c if c == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
}

/// End of `R"delim( ... )delim"` whose opening quote is at `open`.
fn raw_string_end(src: &str, open: usize) -> Option<usize> {
    let rest = &src[open + 1..];
    let paren = rest.find('(')?;
    let delim = &rest[..paren];
    if delim.len() > 16 || delim.contains([' ', '\t', '\n', '\\', ')', '"']) {
        return None;
    }
    let body = open + 1 + paren + 1;
    let closing = format!("){delim}\"");
    src[body..].find(&closing).map(|n| body + n + closing.len())
}

// ---------------------------------------------------------------------------
// Declaration extraction
// ---------------------------------------------------------------------------

/// Where a definition sits: at file/namespace level or inside a class body.
enum Scope {
    File,
    Class(Option<String>),
}

/// Walk everything outside function bodies, collecting function definitions.
fn collect(node: &Node, source: &[u8], scope: &Scope, out: &mut Vec<Declaration>) {
    match node.kind() {
        "function_definition" => match extract_declaration(node, source, scope) {
            Some(decl) => out.push(decl),
            None => debug!(line = node.start_position().row + 1, "Skipping unrecognized definition"),
        },
        "class_specifier" | "struct_specifier" | "union_specifier" => {
            if let Some(body) = node.child_by_field_name("body") {
                let name = node
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(bare_name)
                    .filter(|n| !n.is_empty());
                let inner = Scope::Class(name);
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    collect(&child, source, &inner, out);
                }
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect(&child, source, scope, out);
            }
        }
    }
}

fn extract_declaration(node: &Node, source: &[u8], scope: &Scope) -> Option<Declaration> {
    let (func, suffix) = function_declarator(node.child_by_field_name("declarator")?, source)?;
    let (name, qualifier) = split_name(func.child_by_field_name("declarator")?, source);

    let return_type = node
        .child_by_field_name("type")
        .and_then(|t| t.utf8_text(source).ok())
        .map(|t| format!("{}{suffix}", t.trim()));

    let (kind, enclosing_class) = match scope {
        Scope::Class(class) => (DeclKind::Method, class.clone()),
        Scope::File if qualifier.is_some() => (DeclKind::Method, qualifier),
        Scope::File => (DeclKind::FreeFunction, None),
    };

    let body = node
        .child_by_field_name("body")
        .filter(|b| b.kind() == "compound_statement")
        .map(|b| body_elements(&b, source));

    Some(Declaration {
        kind,
        name,
        return_type,
        enclosing_class,
        body,
        start: node.start_byte(),
    })
}

/// Find the function declarator under pointer / reference wrappers, recording
/// those wrappers as a return-type suffix (`void *f()` returns `void*`).
fn function_declarator<'t>(mut node: Node<'t>, source: &[u8]) -> Option<(Node<'t>, String)> {
    let mut suffix = String::new();
    loop {
        match node.kind() {
            "function_declarator" => return Some((node, suffix)),
            "pointer_declarator" => suffix.push('*'),
            "reference_declarator" => {
                let op = node.child(0).and_then(|c| c.utf8_text(source).ok()).unwrap_or("&");
                suffix.push_str(op);
            }
            "attributed_declarator" | "parenthesized_declarator" => {}
            _ => return None,
        }
        node = node.child_by_field_name("declarator").or_else(|| node.named_child(0))?;
    }
}

/// Split a declarator name into the bare name and its innermost qualifier.
fn split_name(node: Node, source: &[u8]) -> (String, Option<String>) {
    let mut qualifier = None;
    let mut current = node;
    while current.kind() == "qualified_identifier" {
        if let Some(scope) = current.child_by_field_name("scope") {
            qualifier = scope.utf8_text(source).ok().map(bare_name);
        }
        match current.child_by_field_name("name") {
            Some(name) => current = name,
            None => break,
        }
    }
    let name = current.utf8_text(source).unwrap_or("").split_whitespace().collect();
    (name, qualifier)
}

/// Last `::` segment of a type name with template arguments and whitespace removed.
fn bare_name(text: &str) -> String {
    let mut depth = 0usize;
    let mut flat = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 && !c.is_whitespace() => flat.push(c),
            _ => {}
        }
    }
    flat.rsplit("::").next().unwrap_or("").to_string()
}

// ---------------------------------------------------------------------------
// Body elements
// ---------------------------------------------------------------------------

/// Subtrees collapsed into a single element. Returns inside lambdas and local
/// classes belong to those, not to the enclosing function.
const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "raw_string_literal",
    "char_literal",
    "system_lib_string",
    "lambda_expression",
    "class_specifier",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
];

/// Parents under which a `return` statement is one entry of a statement list.
const STATEMENT_LISTS: &[&str] = &[
    "compound_statement",
    "case_statement",
    "labeled_statement",
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
];

fn body_elements(body: &Node, source: &[u8]) -> Vec<StatementRef> {
    let mut out = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if matches!(child.kind(), "{" | "}") {
            continue;
        }
        push_elements(child, source, &mut out);
    }
    out
}

fn push_elements(node: Node, source: &[u8], out: &mut Vec<StatementRef>) {
    let kind = node.kind();
    if kind == "comment" {
        return;
    }
    if node.child_count() > 0 && !ATOMIC_KINDS.contains(&kind) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            push_elements(child, source, out);
        }
        return;
    }

    let (start, end) = (node.start_byte(), node.end_byte());
    if source[start..end].iter().all(u8::is_ascii_whitespace) {
        return;
    }
    let mut stmt = StatementRef::new(
        match kind {
            "return" => StatementKind::Return,
            ";" => StatementKind::Semicolon,
            _ => StatementKind::Other,
        },
        start,
        end,
    );
    if stmt.is_return() {
        stmt.unbraced = is_unbraced(node);
    }
    out.push(stmt);
}

/// A `return` whose statement is the direct body of an `if`/`else`/loop.
fn is_unbraced(keyword: Node) -> bool {
    keyword
        .parent()
        .and_then(|stmt| stmt.parent())
        .is_some_and(|list| !STATEMENT_LISTS.contains(&list.kind()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
