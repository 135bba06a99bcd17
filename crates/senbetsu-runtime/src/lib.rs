mod fetch;
mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use senbetsu_core::clock::{Clock, SystemClock};
use senbetsu_core::config::AppConfig;
use senbetsu_core::disk::{CancelFlag, DiskProvider, FileSetGrouper, LocalDisk};
use senbetsu_core::error::SenbetsuError;
use senbetsu_core::health::{SourceHealthTracker, SourceStatus, StatusStore};
use senbetsu_core::import::{
    filter_existing_files, CandidateResolver, ImportDecision, ImportDecisionMaker,
};
use senbetsu_core::storage::SqliteStatusStore;

pub use fetch::{FeedFetcher, FetchError};
pub use sync::{SourceSync, SyncOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("background task failed: {0}")]
    Join(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<SenbetsuError> for RuntimeError {
    fn from(e: SenbetsuError) -> Self {
        match e {
            SenbetsuError::Config(msg) => Self::Config(msg),
            SenbetsuError::MissingRejectionReason(_) => Self::Config(e.to_string()),
            SenbetsuError::Feed(msg) => Self::Fetch(msg),
            SenbetsuError::Cancelled => Self::Cancelled,
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Shared state for the feed-sync and folder-import passes.
pub struct Runtime {
    config: Arc<RwLock<AppConfig>>,
    health: Arc<SourceHealthTracker>,
    disk: Arc<dyn DiskProvider>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    /// Load the user config and open the status database at its default
    /// location.
    pub fn new() -> Result<Self, RuntimeError> {
        let config = AppConfig::load()?;
        Self::open(config, &AppConfig::db_path())
    }

    /// Use `config` with the status database at `db_path`.
    pub fn open(config: AppConfig, db_path: &Path) -> Result<Self, RuntimeError> {
        let store = SqliteStatusStore::open(db_path)?;
        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(LocalDisk),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn StatusStore>,
        disk: Arc<dyn DiskProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            health: Arc::new(SourceHealthTracker::with_clock(store, Arc::clone(&clock))),
            disk,
            clock,
        }
    }

    pub fn health(&self) -> Arc<SourceHealthTracker> {
        Arc::clone(&self.health)
    }

    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    pub async fn update_config(&self, new_config: AppConfig) -> Result<(), RuntimeError> {
        new_config.save()?;
        *self.config.write().await = new_config;
        Ok(())
    }

    /// Every recorded source status.
    pub async fn source_statuses(&self) -> Result<Vec<SourceStatus>, RuntimeError> {
        let health = self.health();
        blocking(move || health.all_statuses()).await
    }

    /// Group the files under `path` and decide which may be imported, off
    /// the async executor. File sets whose primary file is one of `known`
    /// library files get no decision.
    ///
    /// Raising `cancel` stops the scan before the next file; whatever was
    /// decided up to then is returned.
    pub async fn scan_folder(
        &self,
        path: PathBuf,
        known: Vec<PathBuf>,
        resolver: Arc<dyn CandidateResolver>,
        cancel: CancelFlag,
    ) -> Result<Vec<ImportDecision>, RuntimeError> {
        let import = self.get_config().await.import;
        let disk = Arc::clone(&self.disk);
        let clock = Arc::clone(&self.clock);

        blocking(move || {
            tracing::info!(path = %path.display(), "Scanning folder for import");
            let maker = ImportDecisionMaker::with_defaults(Arc::clone(&disk), clock, &import)?;
            let file_sets = FileSetGrouper::new(disk)
                .with_cancel(cancel)
                .group_files(&path, import.recursive_scan)?;
            let file_sets = filter_existing_files(file_sets, &known);
            maker.decisions(file_sets, resolver.as_ref(), None)
        })
        .await
    }
}

/// Run blocking core work (SQLite, filesystem) on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, RuntimeError>
where
    F: FnOnce() -> Result<T, SenbetsuError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RuntimeError::Join(e.to_string()))?
        .map_err(RuntimeError::from)
}
