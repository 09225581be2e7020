//! Core types shared across tracepatch: the declaration model produced by a
//! [`Frontend`](crate::frontend::Frontend), marker literals, and the immutable
//! runtime settings threaded through every operation.

use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default entry marker: a statement plus a recognizable trailing comment.
pub const DEFAULT_ENTRY_MARKER: &str = "TRACE_ME_IN;\t//<<==--TracePoint!";

/// Default exit marker.
pub const DEFAULT_EXIT_MARKER: &str = "TRACE_ME_OUT;\t//<<==--TracePoint!";

/// Suffix appended to a source path to form its backup path.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Indentation added when a marker has to be broken onto its own line.
pub const DEFAULT_INDENT: &str = "    ";

// ---------------------------------------------------------------------------
// Declaration model
// ---------------------------------------------------------------------------

/// Whether a declaration is a free function or belongs to a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    FreeFunction,
    Method,
}

/// The lexical category of a body element, as far as instrumentation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Return,
    Semicolon,
    Other,
}

/// One element of a function body with byte offsets into the unedited source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRef {
    pub kind: StatementKind,
    pub start: usize,
    pub end: usize,
    /// Set on `return` elements whose statement is the unbraced body of an
    /// `if`/`else`/loop, where a marker statement changes control flow.
    pub unbraced: bool,
}

impl StatementRef {
    pub fn new(kind: StatementKind, start: usize, end: usize) -> Self {
        Self { kind, start, end, unbraced: false }
    }

    pub fn is_return(&self) -> bool {
        self.kind == StatementKind::Return
    }
}

/// A function or method definition found in one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// Declared return type; `None` when absent (constructors, destructors).
    pub return_type: Option<String>,
    /// Only ever set for [`DeclKind::Method`].
    pub enclosing_class: Option<String>,
    /// Body elements in source order; `None` for definitions without a block body.
    pub body: Option<Vec<StatementRef>>,
    /// Byte offset where the definition starts in the unedited source.
    pub start: usize,
}

impl Declaration {
    pub fn is_constructor(&self) -> bool {
        match (&self.kind, &self.enclosing_class) {
            (DeclKind::Method, Some(class)) => self.name == *class,
            _ => false,
        }
    }

    pub fn is_destructor(&self) -> bool {
        match (&self.kind, &self.enclosing_class) {
            (DeclKind::Method, Some(class)) => {
                self.name.strip_prefix('~').is_some_and(|rest| rest == class)
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Which of the two marker literals an insertion carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Entry,
    Exit,
}

/// The entry and exit literals. Each is a single line without its newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub entry: String,
    pub exit: String,
}

impl Markers {
    pub fn new(entry: impl Into<String>, exit: impl Into<String>) -> Self {
        Self { entry: entry.into(), exit: exit.into() }
    }

    pub fn literal(&self, kind: MarkerKind) -> &str {
        match kind {
            MarkerKind::Entry => &self.entry,
            MarkerKind::Exit => &self.exit,
        }
    }

    pub fn all(&self) -> [&str; 2] {
        [&self.entry, &self.exit]
    }

    /// Reason a marker pair can't be used, if any.
    pub fn validate(&self) -> Result<(), String> {
        for literal in self.all() {
            if literal.trim().is_empty() {
                return Err("marker literal is empty".to_string());
            }
            if literal.contains('\n') || literal.contains('\r') {
                return Err(format!("marker literal {literal:?} spans more than one line"));
            }
        }
        if self.entry == self.exit {
            return Err("entry and exit markers are identical".to_string());
        }
        Ok(())
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_MARKER, DEFAULT_EXIT_MARKER)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime configuration. Loaded from `.tracepatch.toml` and CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub markers: Markers,
    /// Extensions picked up during directory discovery.
    pub extensions: HashSet<String>,
    /// Directory names pruned during discovery.
    pub skip_dirs: HashSet<String>,
    pub recursive: bool,
    pub verbose: bool,
    /// Suppress parse-error reports.
    pub quiet: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            markers: Markers::default(),
            extensions: ["c", "cpp", "cc"].iter().map(|s| s.to_string()).collect(),
            skip_dirs: [".git", "build", "target", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recursive: false,
            verbose: false,
            quiet: false,
        }
    }
}
