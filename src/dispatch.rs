//! Incremental rebuilds driven by typed filesystem events.
//!
//! Each event is routed to the root it belongs to and applied to the
//! [`Site`] in one call, so callers holding the site lock apply every event
//! atomically.
//!
//! | Event             | Pages root               | Templates root                   | Assets root         |
//! |-------------------|--------------------------|----------------------------------|---------------------|
//! | created/modified  | reload, re-resolve, write | reload, rewrite dependent pages | copy to output      |
//! | deleted           | unregister, unlink output (or hand it to a rival) | unregister, dependents go stale | unlink mirrored file |
//! | directory events  | ignored                  | ignored                          | ignored             |
//! | moved             | delete `from` + create `to` | same                           | same                |

use crate::{
    build::Site,
    compiler::{BuildError, asset_output_path},
    log,
};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

// ============================================================================
// Event types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
    Moved { to: PathBuf },
}

/// A filesystem change under one of the watched roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl FsEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::file(FsEventKind::Created, path)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::file(FsEventKind::Modified, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::file(FsEventKind::Deleted, path)
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::file(FsEventKind::Moved { to: to.into() }, from)
    }

    fn file(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: false,
        }
    }

    /// Mark the event as concerning a directory.
    pub fn dir(mut self) -> Self {
        self.is_dir = true;
        self
    }
}

/// Which watched root a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Pages,
    Templates,
    Assets,
}

impl Root {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Templates => "templates",
            Self::Assets => "assets",
        }
    }
}

/// Classify `path` by the deepest configured root containing it.
pub fn classify(site: &Site, path: &Path) -> Option<Root> {
    let build = &site.config().build;
    [
        (Root::Pages, &build.pages),
        (Root::Templates, &build.templates),
        (Root::Assets, &build.assets),
    ]
    .into_iter()
    .filter(|(_, root)| path.starts_with(root))
    .max_by_key(|(_, root)| root.components().count())
    .map(|(kind, _)| kind)
}

// ============================================================================
// Outcome
// ============================================================================

/// Output files touched by one event.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Output files written (pages rendered, assets copied).
    pub written: Vec<PathBuf>,
    /// Output files deleted.
    pub removed: Vec<PathBuf>,
    /// Sources that could not be processed.
    pub failed: Vec<(PathBuf, BuildError)>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }

    fn merge(&mut self, other: Outcome) {
        self.written.extend(other.written);
        self.removed.extend(other.removed);
        self.failed.extend(other.failed);
    }

    fn fail(&mut self, path: &Path, err: BuildError) {
        log!("error"; "{}: {err}", path.display());
        self.failed.push((path.to_path_buf(), err));
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Apply one event to the site.
pub fn dispatch(site: &mut Site, event: &FsEvent) -> Outcome {
    if let FsEventKind::Moved { to } = &event.kind {
        let mut outcome = dispatch(site, &FsEvent {
            kind: FsEventKind::Deleted,
            path: event.path.clone(),
            is_dir: event.is_dir,
        });
        outcome.merge(dispatch(site, &FsEvent {
            kind: FsEventKind::Created,
            path: to.clone(),
            is_dir: event.is_dir,
        }));
        return outcome;
    }

    if event.is_dir {
        return Outcome::default();
    }
    let Some(root) = classify(site, &event.path) else {
        return Outcome::default();
    };

    let path = event.path.as_path();
    crate::debug!("watch"; "{:?} in {}: {}", event.kind, root.name(), path.display());

    let deleted = event.kind == FsEventKind::Deleted;
    match (root, deleted) {
        (Root::Pages, false) => page_changed(site, path),
        (Root::Pages, true) => page_deleted(site, path),
        (Root::Templates, false) => template_changed(site, path),
        (Root::Templates, true) => template_deleted(site, path),
        (Root::Assets, false) => asset_changed(site, path),
        (Root::Assets, true) => asset_deleted(site, path),
    }
}

fn page_changed(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    if !site.loader().accepts(path) {
        return outcome;
    }

    match site.load_page(path) {
        Ok(identity) => write(site, &identity, &mut outcome),
        Err(e) => outcome.fail(path, e),
    }
    outcome
}

fn page_deleted(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    let Some((identity, page)) = site
        .page_identity(path)
        .and_then(|id| site.remove_page(&id).map(|page| (id, page)))
    else {
        return outcome;
    };

    // A rival rejected for sharing this output takes it over
    let rival = site
        .output_rival(&identity, &page.doc.name)
        .map(|rival| site.config().build.pages.join(rival))
        .filter(|rival| rival.is_file());
    if let Some(rival) = rival
        && takeover(site, &rival, &mut outcome)
    {
        return outcome;
    }

    unlink(&page.output, &mut outcome);
    log!("page"; "removed: {}", site.display_output(&page.output));
    outcome
}

/// Load and write the page at `path`. Returns whether its output was written.
fn takeover(site: &mut Site, path: &Path, outcome: &mut Outcome) -> bool {
    let identity = match site.load_page(path) {
        Ok(identity) => identity,
        Err(e) => {
            outcome.fail(path, e);
            return false;
        }
    };
    let written = outcome.written.len();
    write(site, &identity, outcome);
    outcome.written.len() > written
}

fn template_changed(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    if !site.loader().accepts(path) {
        return outcome;
    }

    let name = match site.load_template(path) {
        Ok(name) => name,
        Err(e) => {
            outcome.fail(path, e);
            return outcome;
        }
    };

    let dependents = site.state().deps.dependents(&name);
    if !dependents.is_empty() {
        log!("watch"; "template `{name}` changed, rebuilding {} pages", dependents.len());
    }
    for identity in dependents {
        site.refresh_chain(&identity);
        write(site, &identity, &mut outcome);
    }
    outcome
}

/// Dependents keep their last output; their chains are re-resolved so the
/// dependency index stays exact and the error is reported now.
fn template_deleted(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    let Some(name) = site.remove_template(path) else {
        return outcome;
    };
    log!("watch"; "template `{name}` removed");

    for identity in site.state().deps.dependents(&name) {
        site.refresh_chain(&identity);
        if let Some(Err(e)) = site.state().pages.get(&identity).map(|p| &p.chain) {
            outcome.fail(&identity, e.clone());
        }
    }
    outcome
}

fn asset_changed(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    match site.copy_asset(path) {
        Ok(dest) => {
            log!("asset"; "copied: {}", site.display_output(&dest));
            outcome.written.push(dest);
        }
        Err(e) => outcome.fail(path, e),
    }
    outcome
}

fn asset_deleted(site: &mut Site, path: &Path) -> Outcome {
    let mut outcome = Outcome::default();
    let build = &site.config().build;
    // Backends that cannot tell a removed directory from a file report it as a file
    if let Some(dest) = asset_output_path(&build.output, &build.assets, path)
        && !dest.is_dir()
    {
        unlink(&dest, &mut outcome);
        log!("asset"; "removed: {}", site.display_output(&dest));
    }
    outcome
}

fn write(site: &Site, identity: &Path, outcome: &mut Outcome) {
    match site.write_page(identity) {
        Ok(output) => outcome.written.push(output),
        Err(e) => outcome.fail(identity, e),
    }
}

/// Delete an output file; one that is already gone counts as removed.
fn unlink(path: &Path, outcome: &mut Outcome) {
    match fs::remove_file(path) {
        Ok(()) => outcome.removed.push(path.to_path_buf()),
        Err(e) if e.kind() == ErrorKind::NotFound => outcome.removed.push(path.to_path_buf()),
        Err(e) => outcome.fail(path, BuildError::io(path, e)),
    }
}
