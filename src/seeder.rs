use std::path::{Path, PathBuf};

use crate::error::FilesyncError;
use crate::event::{SyncEvent, WatchAction, WatchOrigin};
use crate::session::SyncNotifier;

/// Publish a `boot` event for every existing file matched by `patterns` under `root`.
///
/// Patterns are independent: one that matches nothing is logged and the rest
/// still run. There is no deduplication, so seeding twice publishes every
/// event twice. Returns the published events in pattern order.
pub async fn seed_existing(
    notifier: &SyncNotifier,
    origin: WatchOrigin,
    root: &Path,
    patterns: &[String],
) -> Vec<SyncEvent> {
    let mut published = Vec::new();

    for pattern in patterns {
        let expansion = {
            let root = root.to_path_buf();
            let pattern = pattern.clone();
            tokio::task::spawn_blocking(move || resolve_pattern(&root, &pattern)).await
        };
        let candidates = match expansion {
            Ok(Ok(paths)) => paths,
            Ok(Err(err)) => {
                tracing::warn!(%origin, error = %err, "invalid seed pattern");
                continue;
            }
            Err(err) => {
                tracing::error!(%origin, pattern, error = %err, "seed pattern expansion aborted");
                continue;
            }
        };

        let mut found = false;
        for path in candidates {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                found = true;
                published.push(notifier.notify(&path, origin, WatchAction::Boot, None));
            }
        }

        if !found {
            let err = FilesyncError::SeedFileMissing {
                pattern: root.join(pattern).display().to_string(),
            };
            tracing::warn!(%origin, error = %err, "filesync: seed file missing");
        }
    }

    published
}

/// Concrete candidate paths for a pattern relative to `root`.
///
/// Plain names resolve to a single path; glob patterns expand to the matching
/// files, sorted. Only `pattern` is treated as a glob, `root` is matched
/// literally. Blocking: reads the filesystem.
fn resolve_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, FilesyncError> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![root.join(pattern)]);
    }

    let escaped_root = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));
    let joined = escaped_root.join(pattern);
    let entries =
        glob::glob(&joined.to_string_lossy()).map_err(|source| FilesyncError::SeedPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable path while expanding seed pattern");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}
