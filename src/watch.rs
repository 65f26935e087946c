//! File system watcher for incremental rebuilds.
//!
//! Monitors the pages, templates and assets roots, translates raw notify
//! events into [`FsEvent`]s and applies them to the shared [`Site`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌───────────┐   ┌───────────┐   ┌────────┐  │
//! │  │ notify   │───▶│ translate │──▶│ Debouncer │──▶│dispatch│  │
//! │  │ events   │    │ (FsEvent) │   │ (200ms)   │   │ (lock) │  │
//! │  └──────────┘    └───────────┘   └───────────┘   └────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are applied in arrival order by this single thread, each batch
//! under one acquisition of the site lock.

use crate::{
    build::Site,
    config::normalize_path,
    dispatch::{FsEvent, FsEventKind, dispatch},
    log,
};
use anyhow::{Context, Result};
use notify::{
    Event, EventKind, RecursiveMode, Watcher,
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
};
use parking_lot::Mutex;
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::RecvTimeoutError,
    },
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 200;

/// How often an idle loop checks the shutdown flag.
const IDLE_POLL_MS: u64 = 250;

// =============================================================================
// Event Translation
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

fn event(kind: FsEventKind, path: &Path, is_dir: bool) -> FsEvent {
    FsEvent {
        kind,
        path: normalize_path(path),
        is_dir,
    }
}

/// Translate a raw notify event into typed events.
///
/// Renames involving an editor temp file collapse to the side that matters:
/// saving through a swap file becomes a creation of the real file.
fn translate(raw: Event) -> Vec<FsEvent> {
    let paths = raw.paths.as_slice();
    let keep = |p: &&std::path::PathBuf| !is_temp_file(p);

    match raw.kind {
        EventKind::Create(kind) => paths
            .iter()
            .filter(keep)
            .map(|p| event(FsEventKind::Created, p, kind == CreateKind::Folder || p.is_dir()))
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths {
            [from, to] => {
                let is_dir = to.is_dir();
                match (is_temp_file(from), is_temp_file(to)) {
                    (false, false) => vec![event(
                        FsEventKind::Moved { to: normalize_path(to) },
                        from,
                        is_dir,
                    )],
                    (true, false) => vec![event(FsEventKind::Created, to, is_dir)],
                    (false, true) => vec![event(FsEventKind::Deleted, from, is_dir)],
                    (true, true) => Vec::new(),
                }
            }
            _ => Vec::new(),
        },

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths
            .iter()
            .filter(keep)
            .map(|p| event(FsEventKind::Deleted, p, false))
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths
            .iter()
            .filter(keep)
            .map(|p| event(FsEventKind::Created, p, p.is_dir()))
            .collect(),

        // Backends that cannot pair renames report each side separately
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .filter(keep)
            .map(|p| {
                if p.exists() {
                    event(FsEventKind::Created, p, p.is_dir())
                } else {
                    event(FsEventKind::Deleted, p, false)
                }
            })
            .collect(),

        EventKind::Modify(_) => paths
            .iter()
            .filter(keep)
            .map(|p| event(FsEventKind::Modified, p, p.is_dir()))
            .collect(),

        EventKind::Remove(kind) => paths
            .iter()
            .filter(keep)
            .map(|p| event(FsEventKind::Deleted, p, kind == RemoveKind::Folder))
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events, keeping their order.
struct Debouncer {
    pending: Vec<FsEvent>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
            last_event: None,
        }
    }

    /// Queue events; an event identical to the one before it is dropped.
    fn add(&mut self, events: Vec<FsEvent>) {
        for event in events {
            if self.pending.last() != Some(&event) {
                self.pending.push(event);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<FsEvent> {
        self.last_event = None;
        std::mem::take(&mut self.pending)
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(IDLE_POLL_MS)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Apply a batch of events in order under one lock.
fn handle_changes(site: &Mutex<Site>, events: &[FsEvent]) {
    let mut site = site.lock();
    let (mut written, mut removed, mut failed) = (0, 0, 0);

    for event in events {
        let outcome = dispatch(&mut site, event);
        written += outcome.written.len();
        removed += outcome.removed.len();
        failed += outcome.failed.len();
    }

    if written + removed + failed > 1 {
        log!("watch"; "{written} written, {removed} removed, {failed} failed");
    }
    if written + removed + failed > 0 {
        eprintln!(); // Blank line to separate rebuild sessions
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Format absolute path as relative to root, with trailing slash.
fn format_rel(path: &Path, root: &Path) -> String {
    format!("{}/", path.strip_prefix(root).unwrap_or(path).display())
}

fn setup_watchers(watcher: &mut impl Watcher, site: &Site) -> Result<()> {
    let config = site.config();
    let build = &config.build;
    let mut watched = Vec::new();

    for (name, path) in [
        ("pages", &build.pages),
        ("templates", &build.templates),
        ("assets", &build.assets),
    ] {
        if !path.is_dir() {
            continue;
        }
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {name}: {}", path.display()))?;
        watched.push(format_rel(path, config.get_root()));
    }

    log!("watch"; "watching {}", watched.join(", "));
    eprintln!(); // Blank line to separate init logs from change events
    Ok(())
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the source roots and apply changes until `shutdown` is set.
pub fn watch_for_changes_blocking(site: Arc<Mutex<Site>>, shutdown: Arc<AtomicBool>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, &site.lock())?;

    let mut debouncer = Debouncer::new();

    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) => debouncer.add(translate(event)),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&site, &debouncer.take());
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    Ok(())
}
