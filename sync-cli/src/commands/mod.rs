//! CLI command implementations.

pub mod answer;
pub mod drain;
pub mod fill;
pub mod progress;
pub mod status;
pub mod sweep;
pub mod take;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use practice_sync_client::{
    ConnectivityProbe, HttpProbe, HttpWorkSource, ManualProbe, MockWorkSource, SqliteStore,
    SyncEngine, SystemClock, WorkSource,
};

use crate::config::Config;

/// Database file inside the data directory.
pub const DATABASE_FILE: &str = "offline.db";

/// An engine opened over the data directory for one command.
pub struct Session {
    /// Loaded configuration.
    pub config: Config,
    /// The engine, not started; commands call it directly.
    pub engine: SyncEngine,
    store: SqliteStore,
}

impl Session {
    /// Open the offline database and wire an engine over it.
    ///
    /// With `use_mock`, the work source is an in-process mock that accepts
    /// everything and the device is always online.
    pub async fn open(data_dir: &Path, use_mock: bool) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let store = SqliteStore::open(&data_dir.join(DATABASE_FILE))
            .await
            .context("Failed to open offline database")?;

        let source: Arc<dyn WorkSource>;
        let probe: Arc<dyn ConnectivityProbe>;
        if use_mock {
            source = Arc::new(MockWorkSource::new());
            probe = Arc::new(ManualProbe::new(true));
        } else {
            source = Arc::new(
                HttpWorkSource::new(config.work_source_config())
                    .context("Failed to create HTTP work source")?,
            );
            probe = Arc::new(
                HttpProbe::new(&config.remote.base_url, config.timeout())
                    .context("Failed to create connectivity probe")?,
            );
        }

        let engine = SyncEngine::new(
            config.engine_config(),
            Arc::new(store.clone()),
            source,
            probe,
            Arc::new(SystemClock),
        );

        Ok(Self {
            config,
            engine,
            store,
        })
    }

    /// Flush and close the database.
    pub async fn close(self) {
        self.store.close().await;
    }
}
