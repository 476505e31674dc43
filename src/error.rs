use std::path::PathBuf;

use crate::event::WatchOrigin;

/// Result type for filesync operations.
pub type Result<T> = std::result::Result<T, FilesyncError>;

/// Every failure the watch/seed/handle pipeline can detect.
///
/// None of these leave the subsystem: the component that detects one logs it
/// at the matching severity and keeps running.
#[derive(Debug, thiserror::Error)]
pub enum FilesyncError {
    #[error("watch root for origin {origin} does not exist: {path}")]
    ConfigurationMissing { origin: WatchOrigin, path: PathBuf },

    #[error("seed file pattern {pattern} matched no existing file")]
    SeedFileMissing { pattern: String },

    #[error("invalid seed file pattern {pattern}: {source}")]
    SeedPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("watch subscription for origin {origin} failed: {source}")]
    WatchSubscription {
        origin: WatchOrigin,
        #[source]
        source: notify::Error,
    },

    #[error("invalid data.sync event: {reason}")]
    InvalidEvent { reason: String },

    #[error("import of {entity} from {path} failed: {source:#}")]
    Import {
        entity: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not archive {path} into {destination}: {message}")]
    Archival {
        path: PathBuf,
        destination: PathBuf,
        message: String,
    },

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FilesyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            reason: reason.into(),
        }
    }
}
