//! Per-file processing (patch, unpatch, strip) and the batch runner.
//!
//! Each file is read, processed in memory and written back before the next
//! one starts. A failure on one file is logged and recorded in the report;
//! it never stops the batch.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::error::{FrontendError, SessionError};
use crate::frontend::Frontend;
use crate::patch::{apply, is_already_patched};
use crate::plan::{plan, EditPlan};
use crate::strip::{marker_lines, strip};
use crate::types::{Markers, Settings, BACKUP_SUFFIX};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a batch does to each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Patch,
    Unpatch,
    Strip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Lex,
    Parse,
    Io,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Patched { declarations: usize, instrumented: usize, skipped: usize, entries: usize, exits: usize },
    /// Parsed fine but nothing qualified for instrumentation.
    Unchanged { declarations: usize },
    AlreadyPatched,
    Restored,
    MissingBackup,
    Stripped { lines: usize },
    Failed { kind: FailureKind, message: String },
}

impl FileOutcome {
    fn failed(err: &SessionError) -> Self {
        let kind = match err {
            SessionError::Io { .. } => FailureKind::Io,
            SessionError::Frontend { source, .. } if source.is_lexical() => FailureKind::Lex,
            SessionError::Frontend { .. } => FailureKind::Parse,
        };
        FileOutcome::Failed { kind, message: err.to_string() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Everything a batch did, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub time_ms: u64,
}

impl BatchReport {
    pub fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn failures(&self) -> usize {
        self.count(FileOutcome::is_failure)
    }

    pub fn outcome(&self, path: &Path) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.path == path).map(|f| &f.outcome)
    }
}

// ---------------------------------------------------------------------------
// In-memory pipeline
// ---------------------------------------------------------------------------

/// A patched buffer plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedSource {
    pub text: String,
    pub declarations: usize,
    pub instrumented: usize,
    /// Declarations with a body too small to instrument.
    pub skipped: usize,
    pub entries: usize,
    pub exits: usize,
    /// Exit markers that became the whole body of an unbraced branch or loop.
    pub unbraced: usize,
}

/// Parse, classify, plan and apply for one buffer. Does not consult the
/// already-patched guard; callers decide whether the buffer is eligible.
pub fn patch_source(
    source: &str,
    path: &Path,
    frontend: &dyn Frontend,
    markers: &Markers,
) -> Result<PatchedSource, FrontendError> {
    let decls = frontend.parse(source, path)?;

    let mut skipped = 0;
    let mut plans: Vec<EditPlan> = Vec::with_capacity(decls.len());
    for decl in &decls {
        let class = classify(decl);
        if class.body_too_small {
            skipped += 1;
        }
        plans.push(plan(decl, &class, source, markers));
    }

    let unbraced: usize = plans.iter().map(|p| p.unbraced).sum();
    if unbraced > 0 {
        warn!(
            path = %path.display(),
            count = unbraced,
            "Exit markers placed before unbraced returns; wrap those branches in braces"
        );
    }

    Ok(PatchedSource {
        text: apply(source, &plans),
        declarations: decls.len(),
        instrumented: plans.iter().filter(|p| !p.is_empty()).count(),
        skipped,
        entries: plans.iter().map(|p| p.entries).sum(),
        exits: plans.iter().map(|p| p.exits).sum(),
        unbraced,
    })
}

// ---------------------------------------------------------------------------
// File operations
// ---------------------------------------------------------------------------

/// `name.ext` → `name.ext.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn read_source(path: &Path) -> Result<String, SessionError> {
    let bytes = fs::read(path).map_err(|e| SessionError::io(path, e))?;
    String::from_utf8(bytes).map_err(|e| SessionError::frontend(path, e.into()))
}

/// Back up and instrument one file in place.
pub fn patch_file(
    path: &Path,
    frontend: &dyn Frontend,
    settings: &Settings,
) -> Result<FileOutcome, SessionError> {
    debug!(path = %path.display(), "Processing");
    let source = read_source(path)?;

    if is_already_patched(&source, &settings.markers) {
        warn!(path = %path.display(), "File already contains trace markers; leaving it and its backup alone");
        return Ok(FileOutcome::AlreadyPatched);
    }

    let backup = backup_path(path);
    fs::copy(path, &backup).map_err(|e| SessionError::io(&backup, e))?;

    let patched = patch_source(&source, path, frontend, &settings.markers)
        .map_err(|e| SessionError::frontend(path, e))?;

    if patched.text == source {
        debug!(path = %path.display(), declarations = patched.declarations, "Nothing to instrument");
        return Ok(FileOutcome::Unchanged { declarations: patched.declarations });
    }

    fs::write(path, &patched.text).map_err(|e| SessionError::io(path, e))?;
    debug!(
        path = %path.display(),
        entries = patched.entries,
        exits = patched.exits,
        "Patched"
    );
    Ok(FileOutcome::Patched {
        declarations: patched.declarations,
        instrumented: patched.instrumented,
        skipped: patched.skipped,
        entries: patched.entries,
        exits: patched.exits,
    })
}

/// Move `name.ext.bak` back over `name.ext`.
pub fn unpatch_file(path: &Path) -> Result<FileOutcome, SessionError> {
    let backup = backup_path(path);
    if !backup.is_file() {
        warn!(path = %path.display(), "Could not find backup file");
        return Ok(FileOutcome::MissingBackup);
    }
    fs::rename(&backup, path).map_err(|e| SessionError::io(path, e))?;
    debug!(path = %path.display(), "Restored from backup");
    Ok(FileOutcome::Restored)
}

/// Remove marker lines in place, without touching any backup.
pub fn strip_file(path: &Path, settings: &Settings) -> Result<FileOutcome, SessionError> {
    let source = read_source(path)?;
    let markers = settings.markers.all();
    let lines = marker_lines(&source, &markers).len();
    if lines > 0 {
        fs::write(path, strip(&source, &markers)).map_err(|e| SessionError::io(path, e))?;
    }
    debug!(path = %path.display(), lines, "Stripped");
    Ok(FileOutcome::Stripped { lines })
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Log a per-file failure, honouring the verbose / quiet gates.
fn report_failure(err: &SessionError, settings: &Settings) {
    match err {
        SessionError::Frontend { source, .. } if source.is_lexical() => {
            if settings.verbose {
                error!("{err}");
            }
        }
        SessionError::Frontend { .. } => {
            if !settings.quiet {
                error!("{err}");
            }
        }
        SessionError::Io { .. } => error!("{err}"),
    }
}

/// Process `files` one at a time in the given order.
pub fn run_batch(
    files: &[PathBuf],
    mode: Mode,
    frontend: &dyn Frontend,
    settings: &Settings,
) -> BatchReport {
    let start = Instant::now();
    let mut report = BatchReport::default();

    for path in files {
        let result = match mode {
            Mode::Patch => patch_file(path, frontend, settings),
            Mode::Unpatch => unpatch_file(path),
            Mode::Strip => strip_file(path, settings),
        };
        let outcome = result.unwrap_or_else(|err| {
            report_failure(&err, settings);
            FileOutcome::failed(&err)
        });
        report.files.push(FileReport { path: path.clone(), outcome });
    }

    report.time_ms = start.elapsed().as_millis() as u64;
    info!(
        mode = ?mode,
        files = report.files.len(),
        failed = report.failures(),
        time_ms = report.time_ms,
        "Batch complete"
    );
    report
}
