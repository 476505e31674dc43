pub mod event;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;

use crate::config::WatchOptions;
use crate::event::FileStats;
use event::WatchEvent;

/// Handle to a running watcher. Keeps the debouncer alive (dropping stops watching).
pub struct WatcherHandle {
    /// Keep alive: dropping the debouncer stops the OS watcher.
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// The bridge task forwarding events from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Start a debounced file watcher on `root`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio mpsc receiver
/// that yields classified `WatchEvent`s.
///
/// The watcher:
/// - Debounces for `options.debounce()`, so a file is reported once its writer
///   has been quiet for the settle delay
/// - Only reports files `options.depth` levels or fewer below the root
/// - Only reports files whose extension is in `options.extensions`
/// - Reports files already present as `Added` unless `options.ignore_initial`
/// - Classifies the first sighting of a path as `Added`, later ones as `Changed`;
///   removals are dropped
pub fn start_watcher(
    root: &Path,
    options: &WatchOptions,
) -> notify::Result<(WatcherHandle, tokio_mpsc::Receiver<WatchEvent>)> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(options.debounce(), move |res| {
        let _ = std_tx.send(res);
    })?;
    let mode = if options.depth == 0 {
        RecursiveMode::NonRecursive
    } else {
        RecursiveMode::Recursive
    };
    debouncer.watcher().watch(root, mode)?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<WatchEvent>(256);

    let mut classifier = Classifier::new(root, options.clone());
    let bridge_task = tokio::task::spawn_blocking(move || {
        for path in classifier.existing_files() {
            classifier.observe(&path);
            if classifier.options.ignore_initial {
                continue;
            }
            let stats = file_stats(&path);
            if tokio_tx.blocking_send(WatchEvent::Added { path, stats }).is_err() {
                return;
            }
        }

        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        let Some(watch_event) = classifier.classify(&debounced_event.path) else {
                            continue;
                        };
                        if tokio_tx.blocking_send(watch_event).is_err() {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => {
                    if tokio_tx.blocking_send(WatchEvent::Failed(err)).is_err() {
                        return;
                    }
                }
            }
        }
    });

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// First sighting or repeat sighting of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sighting {
    First,
    Repeat,
}

/// Decides which filesystem paths become notifications and whether they are adds or changes.
struct Classifier {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    options: WatchOptions,
    seen: HashSet<PathBuf>,
}

impl Classifier {
    fn new(root: &Path, options: WatchOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            canonical_root: root.canonicalize().ok(),
            options,
            seen: HashSet::new(),
        }
    }

    /// Files under the root that pass the depth and extension filters, sorted by name.
    fn existing_files(&self) -> Vec<PathBuf> {
        let walker = ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .max_depth(Some(self.options.depth + 1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(root = %self.root.display(), error = %err, "initial scan error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if self.accepts(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
        files
    }

    /// Record a sighting of `path`, returning `None` if it is filtered out.
    fn observe(&mut self, path: &Path) -> Option<Sighting> {
        if !self.accepts(path) {
            return None;
        }
        if self.seen.insert(self.normalize(path)) {
            Some(Sighting::First)
        } else {
            Some(Sighting::Repeat)
        }
    }

    /// Classify a debounced event path into a WatchEvent, or None if it should be ignored.
    fn classify(&mut self, path: &Path) -> Option<WatchEvent> {
        let path = self.normalize(path);
        if !path.is_file() {
            // Removed, or a directory.
            self.seen.remove(&path);
            return None;
        }
        let stats = file_stats(&path);
        match self.observe(&path)? {
            Sighting::First => Some(WatchEvent::Added { path, stats }),
            Sighting::Repeat => Some(WatchEvent::Changed { path, stats }),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        if !self.options.accepts_extension(path) {
            return false;
        }
        match self.depth_of(path) {
            Some(depth) => depth <= self.options.depth,
            None => false,
        }
    }

    /// Rewrite paths reported under the canonical root (e.g. `/private/var` on macOS)
    /// onto the configured root so each file has a single identity.
    fn normalize(&self, path: &Path) -> PathBuf {
        if let Some(canonical) = self.canonical_root.as_deref()
            && let Ok(relative) = path.strip_prefix(canonical)
            && canonical != self.root.as_path()
        {
            return self.root.join(relative);
        }
        path.to_path_buf()
    }

    /// Directory levels between the root and `path` (0 for a file directly in the root).
    fn depth_of(&self, path: &Path) -> Option<usize> {
        let relative = path.strip_prefix(&self.root).ok().or_else(|| {
            self.canonical_root
                .as_deref()
                .and_then(|root| path.strip_prefix(root).ok())
        })?;
        Some(relative.components().count().saturating_sub(1))
    }
}

fn file_stats(path: &Path) -> Option<FileStats> {
    std::fs::metadata(path).ok().map(|m| FileStats::from_metadata(&m))
}
