//! Dependency tracking for incremental builds.
//!
//! Tracks which pages inherit from which templates, so a template change
//! re-renders exactly the pages whose chain includes it.
//!
//! ```text
//! DependencyIndex
//! ├── forward: page → [post, base]       (the page's chain names)
//! └── reverse: base → {blog/a.html, blog/b.html, ...}
//! ```

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DependencyIndex {
    /// page identity → template names in its chain
    forward: FxHashMap<PathBuf, Vec<String>>,
    /// template name → page identities whose chain includes it
    reverse: FxHashMap<String, BTreeSet<PathBuf>>,
}

impl DependencyIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recorded chain of `page` with `names`.
    pub fn record(&mut self, page: &Path, names: &[String]) {
        self.remove_page(page);

        for name in names {
            self.reverse
                .entry(name.clone())
                .or_default()
                .insert(page.to_path_buf());
        }
        self.forward.insert(page.to_path_buf(), names.to_vec());
    }

    /// Drop every entry for `page`.
    pub fn remove_page(&mut self, page: &Path) {
        let Some(names) = self.forward.remove(page) else {
            return;
        };
        for name in names {
            if let Some(pages) = self.reverse.get_mut(&name) {
                pages.remove(page);
                if pages.is_empty() {
                    self.reverse.remove(&name);
                }
            }
        }
    }

    /// Pages whose chain includes `name`, in path order.
    pub fn dependents(&self, name: &str) -> Vec<PathBuf> {
        self.reverse
            .get(name)
            .map(|pages| pages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Template names recorded for `page`.
    pub fn names_of(&self, page: &Path) -> &[String] {
        self.forward.get(page).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_page(&self, page: &Path) -> bool {
        self.forward.contains_key(page)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}
