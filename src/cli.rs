use std::path::PathBuf;

use clap::{Parser, Subcommand};

use filesync::config::CONFIG_FILE;
use filesync::event::{WatchAction, WatchOrigin};

/// Watch seed and remote data directories and publish data.sync events.
///
/// filesync turns JSON data files (`users.json`, `orders.json`) into
/// normalized events naming the entity they hold, seeds files that already
/// exist at startup, and imports each file as it lands.
#[derive(Parser, Debug)]
#[command(
    name = "filesync",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the configured origins and import files as they change, until Ctrl-C.
    Watch {
        /// Configuration file.
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Only watch these origins (default: every configured origin).
        #[arg(long = "origin", value_enum)]
        origins: Vec<WatchOrigin>,
    },

    /// Print the boot events for files that exist now, as JSON lines, without watching.
    Seed {
        /// Configuration file.
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Print the data.sync event a path would produce, as JSON.
    Event {
        /// Path of the data file.
        path: PathBuf,

        /// Origin the file belongs to.
        #[arg(long, value_enum)]
        origin: WatchOrigin,

        /// Action to report.
        #[arg(long, value_enum, default_value_t = WatchAction::Add)]
        action: WatchAction,

        /// Configuration file.
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Print the entity name for a data file name (e.g. users.json -> user).
    Entity {
        /// File name, with or without extension.
        filename: String,
    },

    /// Print the data file name for an entity (e.g. user -> users.json).
    Filename {
        /// Entity name.
        entity: String,
    },
}
