use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use crate::error::AppError;
use crate::models::Snapshot;
use crate::services::excel::ExcelProcessor;
use crate::services::snapshot_cache::SnapshotCache;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub cache: Arc<SnapshotCache>,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let processor = ExcelProcessor::from_config(&config);
        let cache = Arc::new(SnapshotCache::new(processor, config.cache_capacity));
        Self { config, cache }
    }

    /// Resolves the current snapshot off the async runtime.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>, AppError> {
        let cache = self.cache.clone();
        let path = self.config.workbook_path.clone();
        let now = current_time();
        tokio::task::spawn_blocking(move || cache.get_or_load(&path, now))
            .await
            .map_err(|e| AppError::Internal(format!("Snapshot load task failed: {}", e)))
    }

    pub async fn reload(&self) -> Result<Arc<Snapshot>, AppError> {
        let cache = self.cache.clone();
        let path = self.config.workbook_path.clone();
        let now = current_time();
        tokio::task::spawn_blocking(move || cache.reload(&path, now))
            .await
            .map_err(|e| AppError::Internal(format!("Snapshot reload task failed: {}", e)))
    }
}

pub fn current_time() -> NaiveDateTime {
    Local::now().naive_local()
}
