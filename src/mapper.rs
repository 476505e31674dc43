use std::path::{Path, PathBuf};

use crate::config::FilesyncConfig;
use crate::event::{FileStats, SyncEvent, WatchAction, WatchOrigin};
use crate::naming::NamingConvention;

/// Build the canonical event for `filepath`.
///
/// `entity` is the raw filename stem; callers run it through a
/// [`NamingConvention`] before publishing. The archival fields are copied from
/// `origin`'s configuration as it is right now. A path without an extension
/// yields an empty `file_type`.
pub fn build_event(
    config: &FilesyncConfig,
    filepath: &Path,
    origin: WatchOrigin,
    action: WatchAction,
    stats: Option<FileStats>,
) -> SyncEvent {
    let (entity, file_type) = split_filename(filepath);
    let origin_config = config.origin(origin);

    SyncEvent {
        file_type,
        entity,
        origin,
        action,
        filepath: filepath.to_path_buf(),
        errors_path: origin_config.and_then(|c| c.errors_path.clone()),
        history_path: origin_config.and_then(|c| c.history_path.clone()),
        move_after_done: origin_config.is_some_and(|c| c.move_after_done),
        stats,
    }
}

/// [`build_event`] followed by entity normalization.
pub fn build_normalized_event(
    config: &FilesyncConfig,
    naming: &dyn NamingConvention,
    filepath: &Path,
    origin: WatchOrigin,
    action: WatchAction,
    stats: Option<FileStats>,
) -> SyncEvent {
    let mut event = build_event(config, filepath, origin, action, stats);
    event.entity = naming.to_entity(&event.entity);
    event
}

/// Split a basename into (stem, extension). Only the last extension is split
/// off, so `users.backup.json` yields `("users.backup", "json")`.
fn split_filename(filepath: &Path) -> (String, String) {
    let basename = filepath
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match Path::new(&basename).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().into_owned();
            let stem = basename[..basename.len() - ext.len() - 1].to_string();
            (stem, ext)
        }
        None => (basename, String::new()),
    }
}

/// Where the file backing `entity` lives under the remote origin.
pub fn filepath_for_entity(
    config: &FilesyncConfig,
    naming: &dyn NamingConvention,
    entity: &str,
) -> Option<PathBuf> {
    config
        .remote
        .as_ref()
        .map(|remote| remote.path.join(naming.to_filename(entity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OriginConfig;
    use crate::naming::PluralNaming;

    fn config() -> FilesyncConfig {
        let mut seed = OriginConfig::with_path(WatchOrigin::Seed, "/data/seed").unwrap();
        seed.errors_path = Some(PathBuf::from("/data/seed-errors"));

        let mut remote = OriginConfig::with_path(WatchOrigin::Remote, "/data/remote").unwrap();
        remote.history_path = Some(PathBuf::from("/archive"));
        remote.move_after_done = true;

        FilesyncConfig::default()
            .with_origin(WatchOrigin::Seed, seed)
            .with_origin(WatchOrigin::Remote, remote)
    }

    #[test]
    fn test_build_event_splits_stem_and_extension() {
        let event = build_event(
            &config(),
            Path::new("/data/seed/users.json"),
            WatchOrigin::Seed,
            WatchAction::Add,
            None,
        );
        assert_eq!(event.file_type, "json");
        assert_eq!(event.entity, "users");
        assert_eq!(event.filepath, PathBuf::from("/data/seed/users.json"));
    }

    #[test]
    fn test_build_event_without_extension() {
        let event = build_event(
            &config(),
            Path::new("/data/seed/README"),
            WatchOrigin::Seed,
            WatchAction::Change,
            None,
        );
        assert_eq!(event.file_type, "");
        assert_eq!(event.entity, "README");
    }

    #[test]
    fn test_build_event_only_strips_last_extension() {
        let event = build_event(
            &config(),
            Path::new("/data/seed/users.backup.json"),
            WatchOrigin::Seed,
            WatchAction::Add,
            None,
        );
        assert_eq!(event.entity, "users.backup");
        assert_eq!(event.file_type, "json");
    }

    #[test]
    fn test_build_event_copies_origin_archival_settings() {
        let config = config();
        let seed = build_event(
            &config,
            Path::new("/data/seed/users.json"),
            WatchOrigin::Seed,
            WatchAction::Add,
            None,
        );
        assert_eq!(seed.errors_path, Some(PathBuf::from("/data/seed-errors")));
        assert_eq!(seed.history_path, None);
        assert!(!seed.move_after_done);

        let remote = build_event(
            &config,
            Path::new("/data/remote/orders.json"),
            WatchOrigin::Remote,
            WatchAction::Change,
            Some(FileStats {
                size: 12,
                mtime_secs: 1,
            }),
        );
        assert_eq!(remote.history_path, Some(PathBuf::from("/archive")));
        assert_eq!(remote.errors_path, None);
        assert!(remote.move_after_done);
        assert_eq!(remote.stats.map(|s| s.size), Some(12));
    }

    #[test]
    fn test_build_event_for_unconfigured_origin_has_no_archival_settings() {
        let event = build_event(
            &FilesyncConfig::default(),
            Path::new("/x/orders.json"),
            WatchOrigin::Remote,
            WatchAction::Add,
            None,
        );
        assert!(event.history_path.is_none());
        assert!(!event.move_after_done);
    }

    #[test]
    fn test_build_normalized_event_singularizes_entity() {
        let event = build_normalized_event(
            &config(),
            &PluralNaming::default(),
            Path::new("/data/remote/orders.json"),
            WatchOrigin::Remote,
            WatchAction::Change,
            None,
        );
        assert_eq!(event.entity, "order");
        assert_eq!(event.action, WatchAction::Change);
        assert_eq!(event.history_path, Some(PathBuf::from("/archive")));
    }

    #[test]
    fn test_filepath_for_entity_uses_remote_root() {
        let naming = PluralNaming::default();
        assert_eq!(
            filepath_for_entity(&config(), &naming, "order"),
            Some(PathBuf::from("/data/remote/orders.json"))
        );
        assert_eq!(filepath_for_entity(&FilesyncConfig::default(), &naming, "order"), None);
    }
}
