//! Consumer side of the `data.sync` topic: hands files to the import
//! collaborator and archives them afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::context::AppContext;
use crate::error::FilesyncError;
use crate::event::{DATA_SYNC_TOPIC, SyncEvent};

/// The import collaborator that materializes a data file into models.
#[async_trait]
pub trait DataManager: Send + Sync {
    /// Import `filepath` as records of `entity`, returning the imported records.
    async fn import_file_as_models(
        &self,
        entity: &str,
        filepath: &Path,
    ) -> anyhow::Result<Vec<serde_json::Value>>;
}

/// Reads a JSON data file and returns its records: the elements of a
/// top-level array, or the value itself otherwise.
#[derive(Debug, Default, Clone)]
pub struct JsonFileDataManager;

#[async_trait]
impl DataManager for JsonFileDataManager {
    async fn import_file_as_models(
        &self,
        entity: &str,
        filepath: &Path,
    ) -> anyhow::Result<Vec<serde_json::Value>> {
        let bytes = tokio::fs::read(filepath)
            .await
            .with_context(|| format!("reading {}", filepath.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {} as JSON for entity {entity}", filepath.display()))?;
        Ok(match value {
            serde_json::Value::Array(records) => records,
            other => vec![other],
        })
    }
}

/// What happened to one `data.sync` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Payload was not a usable event and was dropped.
    Discarded,
    /// Import succeeded. `archived` is where the file was moved, if it was.
    Imported {
        records: usize,
        archived: Option<PathBuf>,
    },
    /// Import failed; the error was logged.
    Failed,
}

/// Reacts to `data.sync` events. Failures are logged and never propagated.
pub struct DataSyncHandler {
    manager: Arc<dyn DataManager>,
}

impl DataSyncHandler {
    pub fn new(manager: Arc<dyn DataManager>) -> Self {
        Self { manager }
    }

    /// Subscribe this handler to `data.sync` on `context`.
    pub fn install(self: Arc<Self>, context: &AppContext) -> JoinHandle<()> {
        context.on(DATA_SYNC_TOPIC, move |payload| {
            let handler = Arc::clone(&self);
            async move {
                handler.handle(payload).await;
            }
        })
    }

    pub async fn handle(&self, payload: serde_json::Value) -> HandleOutcome {
        tracing::debug!(payload = %payload, "dataSync");

        let event = match validate(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring event");
                return HandleOutcome::Discarded;
            }
        };

        let records = match self
            .manager
            .import_file_as_models(&event.entity, &event.filepath)
            .await
        {
            Ok(records) => records,
            Err(source) => {
                let err = FilesyncError::Import {
                    entity: event.entity.clone(),
                    path: event.filepath.clone(),
                    source,
                };
                tracing::error!("Error while importing file as models.");
                tracing::error!(error = %err, details = ?err, "import failed");
                return HandleOutcome::Failed;
            }
        };

        tracing::info!(entity = %event.entity, records = records.len(), "sync completed");
        tracing::debug!(records = ?records, "imported records");

        let archived = if event.move_after_done {
            match archive(&event).await {
                Ok(dest) => dest,
                Err(err) => {
                    tracing::error!(error = %err, "archival failed, import result kept");
                    None
                }
            }
        } else {
            None
        };

        HandleOutcome::Imported {
            records: records.len(),
            archived,
        }
    }
}

fn validate(payload: serde_json::Value) -> Result<SyncEvent, FilesyncError> {
    if payload.get("entity").is_none_or(|v| v.is_null()) {
        return Err(FilesyncError::invalid_event("missing \"entity\""));
    }
    if payload.get("filepath").is_none_or(|v| v.is_null()) {
        return Err(FilesyncError::invalid_event("missing \"filepath\""));
    }
    let event: SyncEvent =
        serde_json::from_value(payload).map_err(|e| FilesyncError::invalid_event(e.to_string()))?;
    if event.entity.is_empty() {
        return Err(FilesyncError::invalid_event("empty \"entity\""));
    }
    if event.filepath.as_os_str().is_empty() {
        return Err(FilesyncError::invalid_event("empty \"filepath\""));
    }
    Ok(event)
}

/// Move the event's file into its history directory.
///
/// Returns `Ok(None)` when there is no history directory to move into.
async fn archive(event: &SyncEvent) -> Result<Option<PathBuf>, FilesyncError> {
    let Some(history) = event.history_path.as_deref() else {
        tracing::warn!(path = %event.filepath.display(), "moveAfterDone set without historyPath, not archiving");
        return Ok(None);
    };
    if !tokio::fs::try_exists(history).await.unwrap_or(false) {
        tracing::warn!(history = %history.display(), "history path does not exist, not archiving");
        return Ok(None);
    }

    let Some(name) = event.filepath.file_name() else {
        return Err(FilesyncError::Archival {
            path: event.filepath.clone(),
            destination: history.to_path_buf(),
            message: "source has no file name".into(),
        });
    };
    let dest = history.join(name);
    move_file(&event.filepath, &dest)
        .await
        .map_err(|err| FilesyncError::Archival {
            path: event.filepath.clone(),
            destination: dest.clone(),
            message: err.to_string(),
        })?;
    tracing::info!(from = %event.filepath.display(), to = %dest.display(), "archived");
    Ok(Some(dest))
}

/// Rename, falling back to copy + remove when the rename crosses filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{WatchAction, WatchOrigin};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingManager {
        calls: Mutex<Vec<(String, PathBuf)>>,
        fail: bool,
    }

    #[async_trait]
    impl DataManager for RecordingManager {
        async fn import_file_as_models(
            &self,
            entity: &str,
            filepath: &Path,
        ) -> anyhow::Result<Vec<serde_json::Value>> {
            self.calls
                .lock()
                .unwrap()
                .push((entity.to_string(), filepath.to_path_buf()));
            if self.fail {
                anyhow::bail!("database unavailable");
            }
            Ok(vec![json!({"id": 1})])
        }
    }

    fn event(filepath: &Path, history: Option<&Path>, move_after_done: bool) -> serde_json::Value {
        serde_json::to_value(SyncEvent {
            file_type: "json".into(),
            entity: "user".into(),
            origin: WatchOrigin::Seed,
            action: WatchAction::Add,
            filepath: filepath.to_path_buf(),
            errors_path: None,
            history_path: history.map(Path::to_path_buf),
            move_after_done,
            stats: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_event_without_entity_is_discarded() {
        let manager = Arc::new(RecordingManager::default());
        let handler = DataSyncHandler::new(manager.clone());

        let outcome = handler.handle(json!({"filepath": "/data/users.json"})).await;

        assert_eq!(outcome, HandleOutcome::Discarded);
        assert!(manager.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_without_filepath_is_discarded() {
        let manager = Arc::new(RecordingManager::default());
        let handler = DataSyncHandler::new(manager.clone());

        let outcome = handler.handle(json!({"entity": "user"})).await;

        assert_eq!(outcome, HandleOutcome::Discarded);
        assert!(manager.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_failure_is_swallowed() {
        let manager = Arc::new(RecordingManager {
            fail: true,
            ..Default::default()
        });
        let handler = DataSyncHandler::new(manager.clone());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("users.json");
        std::fs::write(&file, "[]").unwrap();

        let outcome = handler
            .handle(event(&file, Some(dir.path()), true))
            .await;

        assert_eq!(outcome, HandleOutcome::Failed);
        assert_eq!(manager.calls.lock().unwrap().len(), 1);
        assert!(file.exists(), "failed imports are not moved");
    }

    #[tokio::test]
    async fn test_successful_import_archives_into_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("archive");
        std::fs::create_dir(&history).unwrap();
        let file = dir.path().join("users.json");
        std::fs::write(&file, "[]").unwrap();
        let handler = DataSyncHandler::new(Arc::new(RecordingManager::default()));

        let outcome = handler.handle(event(&file, Some(&history), true)).await;

        assert_eq!(
            outcome,
            HandleOutcome::Imported {
                records: 1,
                archived: Some(history.join("users.json")),
            }
        );
        assert!(!file.exists());
        assert!(history.join("users.json").exists());
    }

    #[tokio::test]
    async fn test_missing_history_path_skips_archival() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("users.json");
        std::fs::write(&file, "[]").unwrap();
        let handler = DataSyncHandler::new(Arc::new(RecordingManager::default()));

        let outcome = handler
            .handle(event(&file, Some(&dir.path().join("archive")), true))
            .await;

        assert_eq!(
            outcome,
            HandleOutcome::Imported {
                records: 1,
                archived: None,
            }
        );
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_move_after_done_off_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("users.json");
        std::fs::write(&file, "[]").unwrap();
        let handler = DataSyncHandler::new(Arc::new(RecordingManager::default()));

        let outcome = handler.handle(event(&file, Some(dir.path()), false)).await;

        assert!(matches!(outcome, HandleOutcome::Imported { archived: None, .. }));
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_json_file_data_manager_reads_records() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("users.json");
        std::fs::write(&list, r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        let single = dir.path().join("settings.json");
        std::fs::write(&single, r#"{"theme": "dark"}"#).unwrap();

        let manager = JsonFileDataManager;
        assert_eq!(manager.import_file_as_models("user", &list).await.unwrap().len(), 2);
        assert_eq!(
            manager.import_file_as_models("setting", &single).await.unwrap(),
            vec![json!({"theme": "dark"})]
        );
        assert!(
            manager
                .import_file_as_models("user", &dir.path().join("missing.json"))
                .await
                .is_err()
        );
    }
}
