//! Fixture scaffolding for integration tests.

use std::path::{Path, PathBuf};

/// Directory holding the named fixture tree.
pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Copy every file under `src` into `dst`, keeping relative paths. Returns the
/// number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> usize {
    let mut pending = vec![PathBuf::new()];
    let mut copied = 0;
    while let Some(rel) = pending.pop() {
        std::fs::create_dir_all(dst.join(&rel)).expect("Failed to create dir");
        for entry in std::fs::read_dir(src.join(&rel)).expect("Failed to read dir") {
            let rel = rel.join(entry.expect("Failed to read entry").file_name());
            if src.join(&rel).is_dir() {
                pending.push(rel);
            } else {
                std::fs::copy(src.join(&rel), dst.join(&rel)).expect("Failed to copy file");
                copied += 1;
            }
        }
    }
    copied
}

/// Contents of a file in the pristine fixture tree.
pub fn fixture_text(name: &str, rel: &str) -> String {
    let path = fixture_dir(name).join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}
