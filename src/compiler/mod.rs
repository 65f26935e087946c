//! Page compilation: loading, template resolution, rendering.
//!
//! - **loader**: Read a source file and split front matter from content
//! - **chain**: Resolve a document's template chain
//! - **render**: Bottom-up rendering through the chain
//! - **deps**: Template → page dependency tracking for precise rebuilds
//! - **route**: Output path derivation
//!
//! # Flow
//!
//! ```text
//! load() ──► resolve() ──► render() ──► output_path()
//!   │           │             │              │
//!   ▼           ▼             ▼              ▼
//! Document  TemplateChain    HTML     dist/**/index.html
//! ```

pub mod chain;
pub mod deps;
pub mod error;
pub mod loader;
pub mod render;
pub mod route;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use chain::{TemplateChain, Templates, resolve, resolve_tracked};
pub use deps::DependencyIndex;
pub use error::BuildError;
pub use loader::{Document, Loader, Template};
pub use render::{Engine, MiniJinjaEngine, render};
pub use route::{asset_output_path, output_path, output_rival};

/// Mapping used for metadata, shared data and render contexts.
pub type Context = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Shared utilities
// ============================================================================

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all files from a directory recursively, in a stable order.
///
/// A missing directory yields no files.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_all_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.html"), "").unwrap();
        fs::write(dir.path().join("a.html"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files: Vec<_> = collect_all_files(dir.path())
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(files, [PathBuf::from("a.html"), PathBuf::from("b/z.html")]);
    }

    #[test]
    fn test_collect_missing_dir() {
        assert!(collect_all_files(Path::new("/nonexistent/dir")).is_empty());
    }
}
