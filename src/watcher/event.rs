use std::path::PathBuf;

use crate::event::FileStats;

/// Raw notification from a watched root, before it is mapped to a `SyncEvent`.
#[derive(Debug)]
pub enum WatchEvent {
    /// First sighting of a file under the root (including files present when the watch opened).
    Added {
        path: PathBuf,
        stats: Option<FileStats>,
    },
    /// A file that was already reported has been written again.
    Changed {
        path: PathBuf,
        stats: Option<FileStats>,
    },
    /// The watch backend reported an error; the subscription may be degraded.
    Failed(notify::Error),
}
