use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Topic every normalized file event is published on.
pub const DATA_SYNC_TOPIC: &str = "data.sync";

/// Topic announcing that the object-storage sync command refreshed a remote file.
pub const REMOTE_S3_TOPIC: &str = "filesync.remote.s3";

/// Which configured directory tree produced a change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum WatchOrigin {
    /// Bundled initial data.
    Seed,
    /// Externally synced data.
    Remote,
}

impl WatchOrigin {
    pub const ALL: [WatchOrigin; 2] = [WatchOrigin::Seed, WatchOrigin::Remote];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for WatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the file.
///
/// `Boot` is synthesized by the boot seeder for files that were already on
/// disk at startup. Consumers treat it like `Add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    Add,
    Change,
    Boot,
}

impl WatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Boot => "boot",
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem metadata captured when a notification was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub size: u64,
    /// Modification time in seconds since the Unix epoch (0 if unavailable).
    pub mtime_secs: u64,
}

impl FileStats {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let mtime_secs = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            size: metadata.len(),
            mtime_secs,
        }
    }
}

/// The canonical record published on [`DATA_SYNC_TOPIC`].
///
/// Built fresh for every notification and handed off to the bus; nothing in
/// this crate keeps a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    /// Extension without the leading dot, empty when the file has none.
    pub file_type: String,
    pub entity: String,
    pub origin: WatchOrigin,
    pub action: WatchAction,
    pub filepath: PathBuf,
    #[serde(default)]
    pub errors_path: Option<PathBuf>,
    #[serde(default)]
    pub history_path: Option<PathBuf>,
    #[serde(default)]
    pub move_after_done: bool,
    #[serde(default)]
    pub stats: Option<FileStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_event_uses_camel_case_wire_names() {
        let event = SyncEvent {
            file_type: "json".into(),
            entity: "user".into(),
            origin: WatchOrigin::Seed,
            action: WatchAction::Boot,
            filepath: PathBuf::from("/data/seed/users.json"),
            errors_path: None,
            history_path: Some(PathBuf::from("/archive")),
            move_after_done: true,
            stats: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["fileType"], "json");
        assert_eq!(value["origin"], "seed");
        assert_eq!(value["action"], "boot");
        assert_eq!(value["historyPath"], "/archive");
        assert_eq!(value["moveAfterDone"], true);
        assert!(value["stats"].is_null());
    }

    #[test]
    fn test_sync_event_missing_optionals_deserialize_to_defaults() {
        let value = serde_json::json!({
            "fileType": "json",
            "entity": "order",
            "origin": "remote",
            "action": "change",
            "filepath": "/data/remote/orders.json",
        });
        let event: SyncEvent = serde_json::from_value(value).unwrap();
        assert_eq!(event.origin, WatchOrigin::Remote);
        assert_eq!(event.action, WatchAction::Change);
        assert!(!event.move_after_done);
        assert!(event.history_path.is_none());
    }

    #[test]
    fn test_origin_and_action_display() {
        assert_eq!(WatchOrigin::Seed.to_string(), "seed");
        assert_eq!(WatchOrigin::Remote.to_string(), "remote");
        assert_eq!(WatchAction::Boot.to_string(), "boot");
    }
}
