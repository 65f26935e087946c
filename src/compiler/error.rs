//! Build error types.
//!
//! Every variant is scoped to a single file or page: the full build and the
//! watcher decide for themselves whether one failure stops anything else.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Cloneable so a page can keep its last resolution failure and report it
/// again on every render attempt.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// Front matter rejected under the strict metadata policy.
    #[error("cannot load `{path}`: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("template `{name}` not found (required by `{page}`)")]
    MissingTemplate { name: String, page: PathBuf },

    /// The chain, ending with the repeated name.
    #[error("cyclic template chain: {}", .chain.join(" -> "))]
    CyclicTemplate { chain: Vec<String> },

    /// Another registered page already renders to the same output file.
    #[error("`{page}` renders to `{output}`, already written by `{owner}`")]
    OutputConflict {
        page: PathBuf,
        owner: PathBuf,
        output: PathBuf,
    },

    #[error("failed to render `{name}`")]
    Render {
        name: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("IO error on `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_display_shows_full_chain() {
        let err = BuildError::CyclicTemplate {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic template chain: A -> B -> A");
    }

    #[test]
    fn test_missing_template_display() {
        let err = BuildError::MissingTemplate {
            name: "base".into(),
            page: PathBuf::from("blog/post.html"),
        };
        let display = err.to_string();
        assert!(display.contains("`base`"));
        assert!(display.contains("blog/post.html"));
    }
}
