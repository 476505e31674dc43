//! Watch seed and remote data directories for JSON files and publish
//! normalized `data.sync` events for a downstream import layer.
//!
//! The pipeline is: [`watcher`] reports raw add/change notifications,
//! [`mapper`] turns each into a [`event::SyncEvent`], a
//! [`naming::NamingConvention`] turns the filename stem into an entity name,
//! and [`session`] publishes the result on the [`bus`]. [`seeder`] does the
//! same at startup for files that already exist, and [`handler`] is the
//! consumer that imports and archives the files.

pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod mapper;
pub mod naming;
pub mod remote;
pub mod seeder;
pub mod session;
pub mod watcher;

pub use config::{ConfigStore, FilesyncConfig, OriginConfig, WatchOptions};
pub use context::AppContext;
pub use error::{FilesyncError, Result};
pub use event::{DATA_SYNC_TOPIC, FileStats, SyncEvent, WatchAction, WatchOrigin};
pub use handler::{DataManager, DataSyncHandler, JsonFileDataManager};
pub use naming::{NamingConvention, PluralNaming};
pub use session::{DATA_MANAGER_SERVICE, OriginStatus, SyncNotifier, WatchSessionManager};
