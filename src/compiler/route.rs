//! Output path derivation (pretty URLs).
//!
//! | Source (relative)  | Output                      |
//! |--------------------|-----------------------------|
//! | `index.html`       | `<out>/index.html`          |
//! | `a/b/index.html`   | `<out>/a/b/index.html`      |
//! | `a/b/c.html`       | `<out>/a/b/c/index.html`    |

use std::path::{Path, PathBuf};

const INDEX: &str = "index";
const INDEX_FILE: &str = "index.html";

/// Output file for a page with relative source path `identity` and base `name`.
pub fn output_path(output: &Path, identity: &Path, name: &str) -> PathBuf {
    let mut dir = output.join(identity.parent().unwrap_or(Path::new("")));
    if name != INDEX {
        dir.push(name);
    }
    dir.join(INDEX_FILE)
}

/// The other relative source path that renders to the same output file.
///
/// `a.html` and `a/index.html` both become `<out>/a/index.html`; the root
/// `index.html` has no rival.
pub fn output_rival(identity: &Path, name: &str, extension: &str) -> Option<PathBuf> {
    let parent = identity.parent().unwrap_or(Path::new(""));
    if name == INDEX {
        let dir = parent.file_name()?.to_str()?;
        Some(parent.with_file_name(format!("{dir}{extension}")))
    } else {
        Some(parent.join(name).join(format!("{INDEX}{extension}")))
    }
}

/// Mirrored output path of an asset file.
pub fn asset_output_path(output: &Path, assets: &Path, asset: &Path) -> Option<PathBuf> {
    asset.strip_prefix(assets).ok().map(|rel| output.join(rel))
}
