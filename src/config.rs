use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FilesyncError, Result};
use crate::event::WatchOrigin;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "filesync.toml";

/// Debounce used when `await_write_finish` is off.
const QUICK_DEBOUNCE_MS: u64 = 100;

const SEED_DEFAULTS: &str = r#"
entity_files = ["*.json"]
move_after_done = false
boot_seed = true

[options]
depth = 0
await_write_finish = true
settle_delay_ms = 2000
ignore_initial = false
extensions = ["json"]
"#;

const REMOTE_DEFAULTS: &str = r#"
entity_files = []
move_after_done = false
boot_seed = false

[options]
depth = 0
await_write_finish = true
settle_delay_ms = 2000
ignore_initial = false
extensions = ["json"]
"#;

/// Nested key-value view over the parsed config file.
///
/// Keys are addressed with dotted paths (`filesync.seed.path`).
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: toml::Value,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            root: toml::Value::Table(toml::Table::new()),
        }
    }
}

impl ConfigStore {
    pub fn from_value(root: toml::Value) -> Self {
        Self { root }
    }

    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self> {
        let table = toml::from_str::<toml::Table>(contents).map_err(|err| {
            FilesyncError::ConfigParse {
                path: origin.to_path_buf(),
                message: err.to_string(),
            }
        })?;
        Ok(Self::from_value(toml::Value::Table(table)))
    }

    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store; an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).map_err(|err| FilesyncError::io(path, err))?;
        Self::from_toml_str(&contents, path)
    }

    /// Raw value at a dotted path.
    pub fn lookup(&self, path: &str) -> Option<&toml::Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |value, segment| value.get(segment))
    }

    /// Typed value at a dotted path, or `default` when the key is absent or has the wrong type.
    pub fn get<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        let Some(value) = self.lookup(path) else {
            return default;
        };
        match value.clone().try_into::<T>() {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(key = path, error = %err, "config value has unexpected type, using default");
                default
            }
        }
    }
}

/// Watch options for one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchOptions {
    /// How many directory levels below the root are watched (0 = root only).
    pub depth: usize,
    /// Wait for writers to finish before reporting a file.
    pub await_write_finish: bool,
    pub settle_delay_ms: u64,
    /// Skip `add` notifications for files already present when the watch opens.
    pub ignore_initial: bool,
    /// File extensions (without the dot) that produce notifications.
    pub extensions: Vec<String>,
}

impl WatchOptions {
    /// Debounce window handed to the watch primitive.
    pub fn debounce(&self) -> Duration {
        if self.await_write_finish {
            Duration::from_millis(self.settle_delay_ms)
        } else {
            Duration::from_millis(QUICK_DEBOUNCE_MS)
        }
    }

    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// Settings for one watched directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Root directory to watch. Empty when the config file did not set one.
    #[serde(default)]
    pub path: PathBuf,
    pub options: WatchOptions,
    /// Patterns, relative to `path`, checked once at boot.
    pub entity_files: Vec<String>,
    #[serde(default)]
    pub history_path: Option<PathBuf>,
    #[serde(default)]
    pub errors_path: Option<PathBuf>,
    pub move_after_done: bool,
    /// Whether boot seeding runs for this origin.
    pub boot_seed: bool,
}

impl OriginConfig {
    /// Defaults for `origin` with `overrides` deep-merged on top.
    pub fn merged(origin: WatchOrigin, overrides: &toml::Value) -> Result<Self> {
        let mut value = defaults_for(origin)?;
        merge(&mut value, overrides.clone());
        value.try_into().map_err(|err: toml::de::Error| FilesyncError::ConfigParse {
            path: PathBuf::from(format!("filesync.{origin}")),
            message: err.to_string(),
        })
    }

    /// Defaults for `origin` rooted at `path`.
    pub fn with_path(origin: WatchOrigin, path: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self::merged(origin, &toml::Value::Table(toml::Table::new()))?;
        config.path = path.into();
        Ok(config)
    }
}

fn defaults_for(origin: WatchOrigin) -> Result<toml::Value> {
    let source = match origin {
        WatchOrigin::Seed => SEED_DEFAULTS,
        WatchOrigin::Remote => REMOTE_DEFAULTS,
    };
    let table = toml::from_str::<toml::Table>(source).map_err(|err| FilesyncError::ConfigParse {
        path: PathBuf::from(format!("<{origin} defaults>")),
        message: err.to_string(),
    })?;
    Ok(toml::Value::Table(table))
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; everything else replaces.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Immutable watch configuration for all origins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesyncConfig {
    pub seed: Option<OriginConfig>,
    pub remote: Option<OriginConfig>,
}

impl FilesyncConfig {
    /// Build from the `filesync.*` section of `store`.
    ///
    /// An origin is configured only when its table exists and is non-empty.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let mut config = Self::default();
        for origin in WatchOrigin::ALL {
            let key = format!("filesync.{origin}");
            let Some(overrides) = store.lookup(&key) else {
                continue;
            };
            if overrides.as_table().is_none_or(|t| t.is_empty()) {
                continue;
            }
            let merged = OriginConfig::merged(origin, overrides)?;
            *config.slot_mut(origin) = Some(merged);
        }
        Ok(config)
    }

    /// Load `path` and build the configuration from it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_store(&ConfigStore::load(path)?)
    }

    pub fn with_origin(mut self, origin: WatchOrigin, config: OriginConfig) -> Self {
        *self.slot_mut(origin) = Some(config);
        self
    }

    pub fn origin(&self, origin: WatchOrigin) -> Option<&OriginConfig> {
        match origin {
            WatchOrigin::Seed => self.seed.as_ref(),
            WatchOrigin::Remote => self.remote.as_ref(),
        }
    }

    pub fn configured_origins(&self) -> Vec<WatchOrigin> {
        WatchOrigin::ALL
            .into_iter()
            .filter(|o| self.origin(*o).is_some())
            .collect()
    }

    fn slot_mut(&mut self, origin: WatchOrigin) -> &mut Option<OriginConfig> {
        match origin {
            WatchOrigin::Seed => &mut self.seed,
            WatchOrigin::Remote => &mut self.remote,
        }
    }
}
