use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::config::ConfigStore;
use crate::context::AppContext;
use crate::event::REMOTE_S3_TOPIC;

/// Settings from the `[filesync.s3]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Local directory refreshed remote files are written to.
    pub download_dir: Option<PathBuf>,
}

impl RemoteSettings {
    pub fn from_store(store: &ConfigStore) -> Self {
        let path: String = store.get("filesync.s3.path", String::new());
        Self {
            download_dir: (!path.is_empty()).then(|| PathBuf::from(path)),
        }
    }
}

/// Log a notice whenever the object-storage sync command reports a refreshed remote file.
///
/// Fetching the file is the command's job; the refreshed file then shows up
/// through the remote origin's watch like any other write.
pub fn install(context: &AppContext, settings: RemoteSettings) -> JoinHandle<()> {
    let logger = context.logger("filesync");
    context.on(REMOTE_S3_TOPIC, move |payload| {
        let logger = logger.clone();
        let settings = settings.clone();
        async move {
            logger.info(&update_message(&payload, &settings));
        }
    })
}

fn update_message(payload: &serde_json::Value, settings: &RemoteSettings) -> String {
    match (remote_filename(payload), settings.download_dir.as_deref()) {
        (Some(name), Some(dir)) => format!(
            "filesync: remote file updated: {name} -> {}",
            dir.join(name).display()
        ),
        (Some(name), None) => format!("filesync: remote file updated: {name}"),
        (None, _) => "filesync: remote file updated".to_string(),
    }
}

/// `payload.filename`, or `filename` at the top level.
fn remote_filename(message: &serde_json::Value) -> Option<&str> {
    message
        .pointer("/payload/filename")
        .or_else(|| message.get("filename"))
        .and_then(|v| v.as_str())
}
