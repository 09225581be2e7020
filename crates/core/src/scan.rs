//! Source file discovery.

use ignore::WalkBuilder;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::Settings;

/// Resolve the paths given on the command line into a sorted, de-duplicated
/// list of files. With no paths the current directory is searched.
///
/// Directories are searched for files with one of the configured extensions,
/// one level deep unless `settings.recursive`. Explicit file paths are kept
/// as given, whatever their extension.
pub fn discover(paths: &[PathBuf], settings: &Settings) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> =
        if paths.is_empty() { vec![PathBuf::from(".")] } else { paths.to_vec() };

    let mut found = BTreeSet::new();
    for root in &roots {
        if root.is_dir() {
            found.extend(walk_sources(root, settings));
        } else {
            if !root.exists() {
                warn!(path = %root.display(), "Path not found");
            }
            found.insert(clean(root));
        }
    }

    debug!(files = found.len(), "Discovered files");
    found.into_iter().collect()
}

/// Collect files under `dir` whose extension is in `settings.extensions`.
fn walk_sources(dir: &Path, settings: &Settings) -> Vec<PathBuf> {
    let skip: HashSet<String> = settings.skip_dirs.clone();
    let max_depth = if settings.recursive { None } else { Some(1) };

    let mut files = Vec::new();
    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .max_depth(max_depth)
        .filter_entry(move |entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) && entry.depth() > 0 {
                let name = entry.file_name().to_string_lossy();
                return !skip.contains(name.as_ref());
            }
            true
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
        if settings.extensions.contains(ext) {
            files.push(clean(entry.path()));
        }
    }
    files
}

/// Drop a leading `./` so reported paths read naturally.
fn clean(path: &Path) -> PathBuf {
    path.strip_prefix(".").map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}
