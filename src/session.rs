//! Watch sessions: one debounced watch per configured origin, bridged onto the
//! `data.sync` topic.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::config::FilesyncConfig;
use crate::context::AppContext;
use crate::error::FilesyncError;
use crate::event::{DATA_SYNC_TOPIC, FileStats, SyncEvent, WatchAction, WatchOrigin};
use crate::mapper::{build_normalized_event, filepath_for_entity};
use crate::naming::NamingConvention;
use crate::seeder::seed_existing;
use crate::watcher::event::WatchEvent;
use crate::watcher::{WatcherHandle, start_watcher};

/// Service name of the import collaborator. Publishing waits until it is provided.
pub const DATA_MANAGER_SERVICE: &str = "datamanager";

/// Health of one origin's watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginStatus {
    /// Watching and publishing.
    Active,
    /// The watch backend reported an error; notifications may be missing.
    Degraded,
    /// The root was missing or unset, no watch was opened.
    Skipped,
}

/// Turns file notifications into published `SyncEvent`s.
#[derive(Clone)]
pub struct SyncNotifier {
    context: AppContext,
    config: Arc<FilesyncConfig>,
    naming: Arc<dyn NamingConvention>,
}

impl SyncNotifier {
    pub fn new(
        context: AppContext,
        config: Arc<FilesyncConfig>,
        naming: Arc<dyn NamingConvention>,
    ) -> Self {
        Self {
            context,
            config,
            naming,
        }
    }

    pub fn config(&self) -> &FilesyncConfig {
        &self.config
    }

    /// Map, normalize and publish one notification. Returns the published event.
    pub fn notify(
        &self,
        filepath: &Path,
        origin: WatchOrigin,
        action: WatchAction,
        stats: Option<FileStats>,
    ) -> SyncEvent {
        tracing::info!(
            path = %filepath.display(),
            %origin,
            %action,
            "filesync event"
        );
        let event = build_normalized_event(
            &self.config,
            self.naming.as_ref(),
            filepath,
            origin,
            action,
            stats,
        );
        if let Err(err) = self.context.publish(DATA_SYNC_TOPIC, &event) {
            tracing::error!(path = %filepath.display(), error = %err, "could not encode data.sync event");
        }
        event
    }
}

struct Session {
    _watcher: WatcherHandle,
    forward_task: JoinHandle<()>,
}

/// Owns the watch subscriptions for every configured origin.
pub struct WatchSessionManager {
    notifier: SyncNotifier,
    sessions: tokio::sync::Mutex<HashMap<WatchOrigin, Session>>,
    status: Arc<Mutex<HashMap<WatchOrigin, OriginStatus>>>,
}

impl WatchSessionManager {
    pub fn new(
        context: AppContext,
        config: Arc<FilesyncConfig>,
        naming: Arc<dyn NamingConvention>,
    ) -> Self {
        Self {
            notifier: SyncNotifier::new(context, config, naming),
            sessions: tokio::sync::Mutex::new(HashMap::new()),
            status: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn notifier(&self) -> &SyncNotifier {
        &self.notifier
    }

    /// Publish one notification as if the watch for `origin` had reported it.
    pub fn notify(
        &self,
        filepath: &Path,
        origin: WatchOrigin,
        action: WatchAction,
        stats: Option<FileStats>,
    ) -> SyncEvent {
        self.notifier.notify(filepath, origin, action, stats)
    }

    /// Open a watch for each of `origins` that is configured.
    ///
    /// A missing root or a watch that cannot be opened is logged and only
    /// affects that origin. Origins already running are left alone, so boot
    /// seeding happens once per start. Events are held back until the
    /// [`DATA_MANAGER_SERVICE`] has been provided on the context.
    pub async fn start(&self, origins: &[WatchOrigin]) {
        let mut sessions = self.sessions.lock().await;

        for &origin in origins {
            let Some(origin_config) = self.notifier.config.origin(origin) else {
                tracing::debug!(%origin, "origin not configured, not watching");
                continue;
            };
            if sessions.contains_key(&origin) {
                tracing::debug!(%origin, "origin already watched");
                continue;
            }

            let root = origin_config.path.clone();
            let root_exists = !root.as_os_str().is_empty()
                && tokio::fs::try_exists(&root).await.unwrap_or(false);
            if !root_exists {
                let err = FilesyncError::ConfigurationMissing {
                    origin,
                    path: root.clone(),
                };
                tracing::error!(error = %err, "path does not exist, filesync will not watch this origin");
                tracing::error!(%origin, options = ?origin_config.options, "watch options");
                self.set_status(origin, OriginStatus::Skipped);
                continue;
            }

            let (watcher, rx) = match start_watcher(&root, &origin_config.options) {
                Ok(started) => started,
                Err(source) => {
                    let err = FilesyncError::WatchSubscription { origin, source };
                    tracing::error!(error = %err, "could not open watch");
                    self.set_status(origin, OriginStatus::Degraded);
                    continue;
                }
            };

            tracing::info!(%origin, root = %root.display(), "watching");
            self.set_status(origin, OriginStatus::Active);

            let seed_patterns = if origin_config.boot_seed {
                Some(origin_config.entity_files.clone())
            } else {
                None
            };
            let forward_task = tokio::spawn(forward(
                self.notifier.clone(),
                Arc::clone(&self.status),
                origin,
                root,
                seed_patterns,
                rx,
            ));

            sessions.insert(
                origin,
                Session {
                    _watcher: watcher,
                    forward_task,
                },
            );
        }
    }

    /// Close every open watch. Safe to call repeatedly or before `start`.
    ///
    /// Imports already handed to the bus keep running.
    pub async fn stop(&self) {
        let mut sessions = self.sessions.lock().await;
        for (origin, session) in sessions.drain() {
            session.forward_task.abort();
            tracing::info!(%origin, "stopped watching");
        }
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn status(&self, origin: WatchOrigin) -> Option<OriginStatus> {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&origin)
            .copied()
    }

    /// Path of the remote file backing `entity`, if a remote origin is configured.
    pub fn filepath_for_entity(&self, entity: &str) -> Option<std::path::PathBuf> {
        filepath_for_entity(
            &self.notifier.config,
            self.notifier.naming.as_ref(),
            entity,
        )
    }

    fn set_status(&self, origin: WatchOrigin, status: OriginStatus) {
        set_status(&self.status, origin, status);
    }
}

fn set_status(
    map: &Mutex<HashMap<WatchOrigin, OriginStatus>>,
    origin: WatchOrigin,
    status: OriginStatus,
) {
    map.lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(origin, status);
}

/// Wait for the import collaborator, seed, then forward watch notifications until the watch closes.
async fn forward(
    notifier: SyncNotifier,
    status: Arc<Mutex<HashMap<WatchOrigin, OriginStatus>>>,
    origin: WatchOrigin,
    root: std::path::PathBuf,
    seed_patterns: Option<Vec<String>>,
    mut rx: tokio::sync::mpsc::Receiver<WatchEvent>,
) {
    notifier.context.resolve(DATA_MANAGER_SERVICE).await;
    tracing::info!(%origin, service = DATA_MANAGER_SERVICE, "dependency resolved");

    if let Some(patterns) = seed_patterns {
        seed_existing(&notifier, origin, &root, &patterns).await;
    }

    while let Some(event) = rx.recv().await {
        match event {
            WatchEvent::Added { path, stats } => {
                notifier.notify(&path, origin, WatchAction::Add, stats);
            }
            WatchEvent::Changed { path, stats } => {
                notifier.notify(&path, origin, WatchAction::Change, stats);
            }
            WatchEvent::Failed(source) => {
                let err = FilesyncError::WatchSubscription { origin, source };
                tracing::warn!(error = %err, "watch degraded");
                set_status(&status, origin, OriginStatus::Degraded);
            }
        }
    }
}
