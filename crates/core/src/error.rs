//! Error types for parsing and per-file processing.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`Frontend`](crate::frontend::Frontend).
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Malformed token stream (unterminated literal or comment).
    #[error("token error at line {line}: {detail}")]
    Lex { line: usize, detail: String },
    /// Malformed grammar.
    #[error("parsing error at line {line}: {detail}")]
    Parse { line: usize, detail: String },
    /// Source bytes are not valid UTF-8.
    #[error("parsing error: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    /// The grammar could not be loaded or the parser gave up.
    #[error("parser unavailable: {0}")]
    Grammar(String),
}

impl FrontendError {
    pub fn is_lexical(&self) -> bool {
        matches!(self, FrontendError::Lex { .. })
    }
}

/// Failures while processing one file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Frontend {
        path: PathBuf,
        #[source]
        source: FrontendError,
    },
}

impl SessionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io { path: path.into(), source }
    }

    pub fn frontend(path: impl Into<PathBuf>, source: FrontendError) -> Self {
        SessionError::Frontend { path: path.into(), source }
    }
}
