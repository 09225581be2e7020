//! tracepatch: entry/exit trace marker instrumentation for C and C++ sources.
//!
//! Every function body with more than a couple of statements gets an entry
//! marker before its first statement and an exit marker before each `return`
//! (plus one at the closing brace for functions that can fall off the end).
//! A `.bak` copy of each file is kept so the change can be undone, and marker
//! lines can also be stripped in place.
//!
//! A `return` that is the whole body of an unbraced `if`, `else` or loop
//! still gets its exit marker in front of it. That marker then becomes the
//! branch body and the `return` runs unconditionally, so such files are
//! reported with a warning; brace those branches before patching.
//!
//! # Modules
//!
//! - [`types`]: Declarations, body elements, markers and settings
//! - [`frontend`]: Declaration extraction (tree-sitter C / C++)
//! - [`classify`]: Return-type and body-size classification
//! - [`plan`]: Insertion planning and marker rendering
//! - [`patch`]: Already-patched guard and edit application
//! - [`strip`]: Marker line removal
//! - [`position`]: Byte-offset line helpers
//! - [`scan`]: Source file discovery
//! - [`session`]: Per-file pipeline and batch runner
//! - [`error`]: Error types

pub mod classify;
pub mod error;
pub mod frontend;
pub mod patch;
pub mod plan;
pub mod position;
pub mod scan;
pub mod session;
pub mod strip;
pub mod types;

pub use error::{FrontendError, SessionError};
pub use frontend::{Frontend, TreeSitterFrontend};
pub use session::{run_batch, BatchReport, FileOutcome, Mode};
pub use types::{Markers, Settings};

use std::path::Path;
use tracing::{debug, warn};

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = ".tracepatch.toml";

const KNOWN_CONFIG_KEYS: &[&str] = &["entry_marker", "exit_marker", "extensions", "skip_dirs"];

/// Levenshtein distance over chars, keeping one row of the table.
fn edit_distance(a: &str, b: &str) -> usize {
    let target: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=target.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in target.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[target.len()]
}

fn warn_unknown_key(key: &str) {
    let suggestion = KNOWN_CONFIG_KEYS.iter().min_by_key(|k| edit_distance(key, k));
    match suggestion {
        Some(s) if edit_distance(key, s) <= 3 => {
            warn!(key, suggestion = *s, "Unknown key in {CONFIG_FILE}; did you mean '{s}'?");
        }
        _ => warn!(
            key,
            "Unknown key in {CONFIG_FILE} (known keys: {})",
            KNOWN_CONFIG_KEYS.join(", ")
        ),
    }
}

fn string_list(value: &toml::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Merge a parsed config table into `settings`.
pub fn apply_config(settings: &mut Settings, table: &toml::Table) {
    for key in table.keys() {
        if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
            warn_unknown_key(key);
        }
    }

    let entry = table.get("entry_marker").and_then(|v| v.as_str());
    let exit = table.get("exit_marker").and_then(|v| v.as_str());
    if entry.is_some() || exit.is_some() {
        let candidate = Markers::new(
            entry.unwrap_or(&settings.markers.entry),
            exit.unwrap_or(&settings.markers.exit),
        );
        match candidate.validate() {
            Ok(()) => settings.markers = candidate,
            Err(reason) => warn!(reason = %reason, "Ignoring configured markers"),
        }
    }

    // extensions replace the defaults
    if let Some(exts) = table.get("extensions") {
        let exts: Vec<String> =
            string_list(exts).into_iter().map(|e| e.trim_start_matches('.').to_string()).collect();
        if exts.is_empty() {
            warn!("Empty `extensions` in {CONFIG_FILE}; keeping defaults");
        } else {
            settings.extensions = exts.into_iter().collect();
        }
    }

    // skip_dirs merge with the defaults
    if let Some(dirs) = table.get("skip_dirs") {
        settings.skip_dirs.extend(string_list(dirs));
    }
}

/// Load settings from `explicit`, or from [`CONFIG_FILE`] under `project_root`.
///
/// A missing default file is silent. A missing explicit file, an unreadable
/// file, or invalid TOML warns and yields defaults.
pub fn load_settings(project_root: &Path, explicit: Option<&Path>) -> Settings {
    let mut settings = Settings::default();
    let config_path = match explicit {
        Some(p) => p.to_path_buf(),
        None => project_root.join(CONFIG_FILE),
    };

    if !config_path.exists() {
        if explicit.is_some() {
            warn!(path = %config_path.display(), "Config file not found; using defaults");
        }
        return settings;
    }

    debug!(path = %config_path.display(), "Loading config");
    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Could not read config file");
            return settings;
        }
    };
    match content.parse::<toml::Table>() {
        Ok(table) => apply_config(&mut settings, &table),
        Err(e) => warn!(path = %config_path.display(), error = %e, "Failed to parse config file"),
    }
    settings
}
