//! Test harness for file-level instrumentation tests.
//!
//! Copies a fixture tree (or nothing) into a temp dir so tests can patch,
//! unpatch and strip real files without touching the checked-in fixtures.

pub mod fixtures;

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracepatch_core::Settings;

pub struct Workspace {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Workspace {
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Workspace { _temp_dir: temp_dir, root }
    }

    /// Create a workspace holding a copy of `tests/fixtures/<name>`.
    pub fn from_fixture(name: &str) -> Self {
        let fixture_src = fixtures::fixture_dir(name);
        assert!(fixture_src.exists(), "Fixture '{name}' not found at {}", fixture_src.display());
        let ws = Self::empty();
        let copied = fixtures::copy_tree(&fixture_src, &ws.root);
        assert!(copied > 0, "Fixture '{name}' is empty");
        ws
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("Failed to read file")
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

pub fn settings() -> Settings {
    Settings::default()
}
