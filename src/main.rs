mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use filesync::mapper::build_normalized_event;
use filesync::naming::NamingConvention;
use filesync::remote::RemoteSettings;
use filesync::seeder::seed_existing;
use filesync::{
    AppContext, ConfigStore, DATA_MANAGER_SERVICE, DataSyncHandler, FilesyncConfig,
    JsonFileDataManager, PluralNaming, SyncNotifier, WatchSessionManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    filesync::logging::init(cli.verbose)?;

    match cli.command {
        Commands::Watch { config, origins } => {
            let store = ConfigStore::load(&config)?;
            let config = Arc::new(FilesyncConfig::from_store(&store)?);
            let origins = if origins.is_empty() {
                config.configured_origins()
            } else {
                origins
            };
            if origins.is_empty() {
                anyhow::bail!("no origins configured; add [filesync.seed] or [filesync.remote]");
            }

            let context = AppContext::default();
            let handler = Arc::new(DataSyncHandler::new(Arc::new(JsonFileDataManager)));
            let handler_task = handler.install(&context);
            let remote_task =
                filesync::remote::install(&context, RemoteSettings::from_store(&store));

            let manager = WatchSessionManager::new(
                context.clone(),
                Arc::clone(&config),
                Arc::new(PluralNaming::default()),
            );
            manager.start(&origins).await;
            context.provide(DATA_MANAGER_SERVICE);

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            manager.stop().await;
            handler_task.abort();
            remote_task.abort();
        }
        Commands::Seed { config } => {
            let config = Arc::new(FilesyncConfig::load(&config)?);
            let notifier = SyncNotifier::new(
                AppContext::default(),
                Arc::clone(&config),
                Arc::new(PluralNaming::default()),
            );
            for origin in config.configured_origins() {
                let Some(origin_config) = config.origin(origin) else {
                    continue;
                };
                if !origin_config.boot_seed {
                    continue;
                }
                let events = seed_existing(
                    &notifier,
                    origin,
                    &origin_config.path,
                    &origin_config.entity_files,
                )
                .await;
                for event in events {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
        }
        Commands::Event {
            path,
            origin,
            action,
            config,
        } => {
            let config = FilesyncConfig::load(&config)?;
            let stats = std::fs::metadata(&path)
                .ok()
                .map(|m| filesync::FileStats::from_metadata(&m));
            let event = build_normalized_event(
                &config,
                &PluralNaming::default(),
                &path,
                origin,
                action,
                stats,
            );
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Commands::Entity { filename } => {
            let stem = Path::new(&filename)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(filename);
            println!("{}", PluralNaming::default().to_entity(&stem));
        }
        Commands::Filename { entity } => {
            println!("{}", PluralNaming::default().to_filename(&entity));
        }
    }

    Ok(())
}
